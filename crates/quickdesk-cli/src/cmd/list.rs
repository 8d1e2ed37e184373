//! `qd list` — filtered, sorted ticket listings.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Args;
use quickdesk_core::error::ErrorCode;
use quickdesk_core::model::{Priority, Role, Status, Ticket};
use quickdesk_core::view::{self, SortOrder, TicketFilter};
use serde::Serialize;

use crate::cmd::category::resolve_category;
use crate::cmd::user::resolve_user;
use crate::cmd::{Workspace, fail};
use crate::output::{CliError, OutputMode, pretty_section, render_mode, truncate};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only tickets in this status.
    #[arg(long)]
    pub status: Option<Status>,

    /// Only tickets with this priority.
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Category id or name.
    #[arg(long)]
    pub category: Option<String>,

    /// Case-insensitive text in subject or description.
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only tickets you opened.
    #[arg(long)]
    pub mine: bool,

    /// Only tickets assigned to you.
    #[arg(long, conflicts_with = "assignee")]
    pub assigned_to_me: bool,

    /// Only tickets assigned to this user (id or email).
    #[arg(long)]
    pub assignee: Option<String>,

    /// recent, oldest, newest, priority, votes or insertion.
    /// Defaults to `[list] sort` in config.toml.
    #[arg(long)]
    pub sort: Option<SortOrder>,

    /// Show at most this many tickets (0 = no limit).
    /// Defaults to `[list] limit` in config.toml.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// One line of a ticket listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TicketRow {
    id: String,
    subject: String,
    status: Status,
    priority: Priority,
    category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned_to: Option<String>,
    net_votes: i64,
    updated_at: DateTime<Utc>,
}

impl TicketRow {
    fn new(ticket: &Ticket, category_name: Option<&str>) -> Self {
        Self {
            id: ticket.id.clone(),
            subject: ticket.subject.clone(),
            status: ticket.status,
            priority: ticket.priority,
            category: ticket.category.clone(),
            category_name: category_name.map(str::to_string),
            assigned_to: ticket.assigned_to.clone(),
            net_votes: ticket.net_votes(),
            updated_at: ticket.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ListOutput {
    total: usize,
    sort: String,
    tickets: Vec<TicketRow>,
}

pub fn run_list(
    args: &ListArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ws = Workspace::open(project_root, output)?;
    let actor = ws.optional_actor(as_flag, output)?;

    let sort = match args.sort {
        Some(sort) => sort,
        None => ws.config.list.sort_order().map_err(|e| {
            fail(
                output,
                &CliError::with_details(
                    format!("{e:#}"),
                    "Use one of recent, oldest, newest, priority, votes, insertion",
                    ErrorCode::ConfigParseError.code(),
                ),
            )
        })?,
    };
    let limit = args.limit.unwrap_or(ws.config.list.limit);

    let mut filter = TicketFilter {
        search: args.search.clone(),
        status: args.status,
        priority: args.priority,
        ..TicketFilter::default()
    };
    if let Some(reference) = args.category.as_deref() {
        filter.category = Some(resolve_category(&ws.desk, reference, output)?.id);
    }
    if let Some(reference) = args.assignee.as_deref() {
        filter.assigned_to = Some(resolve_user(&ws.desk, reference, output)?.id);
    }

    if args.mine || args.assigned_to_me {
        let Some(me) = actor.as_ref() else {
            return Err(fail(
                output,
                &CliError::with_details(
                    "--mine and --assigned-to-me need an acting user",
                    "Run `qd login <email>` or pass --as",
                    "missing_identity",
                ),
            ));
        };
        if args.mine {
            filter.created_by = Some(me.id.clone());
        }
        if args.assigned_to_me {
            filter.assigned_to = Some(me.id.clone());
        }
    }
    // End users only ever see their own tickets.
    if let Some(me) = actor.as_ref().filter(|u| u.role == Role::EndUser) {
        filter.created_by = Some(me.id.clone());
    }

    let matched = view::list_tickets(ws.desk.tickets(), &filter, sort);
    let total = matched.len();
    let shown = if limit == 0 { total } else { limit.min(total) };
    let categories = ws.desk.categories();
    let tickets: Vec<TicketRow> = matched
        .into_iter()
        .take(shown)
        .map(|t| TicketRow::new(t, view::category_of(categories, t).map(|c| c.name.as_str())))
        .collect();
    tracing::debug!(total, shown, %sort, "listed tickets");

    let report = ListOutput {
        total,
        sort: sort.to_string(),
        tickets,
    };

    render_mode(
        output,
        &report,
        |r, w| {
            for row in &r.tickets {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    row.id,
                    row.status,
                    row.priority,
                    row.category_name.as_deref().unwrap_or(&row.category),
                    row.net_votes,
                    row.subject,
                )?;
            }
            Ok(())
        },
        |r, w| {
            if r.tickets.is_empty() {
                return writeln!(w, "No tickets match.");
            }
            let heading = if r.tickets.len() < r.total {
                format!("Tickets ({} of {}, by {})", r.tickets.len(), r.total, r.sort)
            } else {
                format!("Tickets ({}, by {})", r.total, r.sort)
            };
            pretty_section(w, &heading)?;
            for row in &r.tickets {
                writeln!(
                    w,
                    "{:<14} {:<11} {:<7} {:>+4}  {:<16} {}",
                    row.id,
                    row.status.as_str(),
                    row.priority.as_str(),
                    row.net_votes,
                    truncate(row.category_name.as_deref().unwrap_or("(uncategorized)"), 16),
                    truncate(&row.subject, 40),
                )?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn parses_filters() {
        let w = Wrapper::parse_from([
            "test", "--status", "in-progress", "--priority", "urgent", "--sort", "votes", "-n", "5",
            "--mine",
        ]);
        assert_eq!(w.args.status, Some(Status::InProgress));
        assert_eq!(w.args.priority, Some(Priority::Urgent));
        assert_eq!(w.args.sort, Some(SortOrder::Votes));
        assert_eq!(w.args.limit, Some(5));
        assert!(w.args.mine);
    }

    #[test]
    fn assignee_flags_conflict() {
        let res = Wrapper::try_parse_from([
            "test",
            "--assigned-to-me",
            "--assignee",
            "agent@quickdesk.com",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(Wrapper::try_parse_from(["test", "--status", "pending"]).is_err());
    }
}
