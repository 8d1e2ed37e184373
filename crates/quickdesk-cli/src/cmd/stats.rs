//! `qd stats` — the dashboard numbers for the acting user's role.
//!
//! Admins get the whole-desk overview, support agents their queue, and end
//! users a status breakdown of the tickets they opened.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use quickdesk_core::model::Role;
use quickdesk_core::view::{self, AgentQueue, DeskStats, StatusCounts};
use serde::Serialize;

use crate::cmd::Workspace;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Debug, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
enum StatsOutput {
    Desk {
        #[serde(flatten)]
        stats: DeskStats,
        /// Category id to display name, for `by_category`.
        category_names: BTreeMap<String, String>,
    },
    Agent {
        queue: AgentQueue,
        tickets: StatusCounts,
    },
    Mine {
        tickets: StatusCounts,
    },
}

fn write_status_counts(w: &mut dyn Write, counts: &StatusCounts) -> std::io::Result<()> {
    pretty_kv(w, "total", counts.total.to_string())?;
    pretty_kv(w, "open", counts.open.to_string())?;
    pretty_kv(w, "in progress", counts.in_progress.to_string())?;
    pretty_kv(w, "resolved", counts.resolved.to_string())?;
    pretty_kv(w, "closed", counts.closed.to_string())
}

pub fn run_stats(
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ws = Workspace::open(project_root, output)?;
    let me = ws.actor(as_flag, output)?;
    let desk = &ws.desk;

    let report = match me.role {
        Role::Admin => StatsOutput::Desk {
            stats: view::desk_stats(
                desk.tickets(),
                desk.users(),
                desk.categories(),
                desk.comments(),
            ),
            category_names: desk
                .categories()
                .iter()
                .map(|c| (c.id.clone(), c.name.clone()))
                .collect(),
        },
        Role::SupportAgent => StatsOutput::Agent {
            queue: view::agent_queue(desk.tickets(), &me.id),
            tickets: StatusCounts::tally(desk.tickets()),
        },
        Role::EndUser => StatsOutput::Mine {
            tickets: StatusCounts::tally(
                desk.tickets()
                    .iter()
                    .filter(|t| t.created_by == me.id),
            ),
        },
    };

    render_mode(
        output,
        &report,
        |r, w| match r {
            StatsOutput::Desk { stats, .. } => {
                writeln!(
                    w,
                    "tickets\t{}\topen\t{}\tin_progress\t{}\tresolved\t{}\tclosed\t{}",
                    stats.tickets.total,
                    stats.tickets.open,
                    stats.tickets.in_progress,
                    stats.tickets.resolved,
                    stats.tickets.closed
                )?;
                writeln!(
                    w,
                    "users\t{}\tcategories\t{}\tcomments\t{}",
                    stats.users, stats.categories, stats.comments
                )?;
                for (id, count) in &stats.by_category {
                    writeln!(w, "category\t{id}\t{count}")?;
                }
                Ok(())
            }
            StatsOutput::Agent { queue, .. } => writeln!(
                w,
                "total\t{}\tassigned\t{}\topen\t{}\tin_progress\t{}",
                queue.total, queue.assigned, queue.open, queue.in_progress
            ),
            StatsOutput::Mine { tickets } => writeln!(
                w,
                "total\t{}\topen\t{}\tin_progress\t{}\tresolved\t{}",
                tickets.total, tickets.open, tickets.in_progress, tickets.resolved
            ),
        },
        |r, w| match r {
            StatsOutput::Desk {
                stats,
                category_names,
            } => {
                pretty_section(w, "Tickets")?;
                write_status_counts(w, &stats.tickets)?;
                writeln!(w)?;
                pretty_section(w, "Priorities")?;
                pretty_kv(w, "urgent", stats.priorities.urgent.to_string())?;
                pretty_kv(w, "high", stats.priorities.high.to_string())?;
                pretty_kv(w, "medium", stats.priorities.medium.to_string())?;
                pretty_kv(w, "low", stats.priorities.low.to_string())?;
                writeln!(w)?;
                pretty_section(w, "Desk")?;
                pretty_kv(
                    w,
                    "users",
                    format!(
                        "{} ({} admin, {} agent, {} end user)",
                        stats.users,
                        stats.roles.admin,
                        stats.roles.support_agent,
                        stats.roles.end_user
                    ),
                )?;
                pretty_kv(w, "categories", stats.categories.to_string())?;
                pretty_kv(w, "comments", stats.comments.to_string())?;
                writeln!(w)?;
                pretty_section(w, "By category")?;
                for (id, count) in &stats.by_category {
                    let name = category_names.get(id).map_or("(deleted)", String::as_str);
                    writeln!(w, "{count:>5}  {name} [{id}]")?;
                }
                Ok(())
            }
            StatsOutput::Agent { queue, tickets } => {
                pretty_section(w, "Your queue")?;
                pretty_kv(w, "assigned", queue.assigned.to_string())?;
                writeln!(w)?;
                pretty_section(w, "All tickets")?;
                write_status_counts(w, tickets)
            }
            StatsOutput::Mine { tickets } => {
                pretty_section(w, "Your tickets")?;
                write_status_counts(w, tickets)
            }
        },
    )
}
