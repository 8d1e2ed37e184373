//! `qd update` and `qd assign` — edit ticket fields and ownership.

use std::io::Write;
use std::path::Path;

use clap::Args;
use quickdesk_core::model::{Priority, Status, Ticket, TicketPatch, User};
use quickdesk_core::timing;

use crate::actor::{self, ActorError};
use crate::cmd::category::resolve_category;
use crate::cmd::show::resolve_ticket;
use crate::cmd::user::resolve_user;
use crate::cmd::{Workspace, check_actor, check_input, desk_fail, fail};
use crate::output::{CliError, OutputMode, pretty_kv, render};
use crate::validate;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Ticket id.
    pub id: String,

    #[arg(short, long)]
    pub subject: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// Category id or name.
    #[arg(short, long)]
    pub category: Option<String>,

    /// New status (support agents and admins only).
    #[arg(long)]
    pub status: Option<Status>,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Replace the attachment list (repeatable).
    #[arg(short, long = "attachment", conflicts_with = "clear_attachments")]
    pub attachments: Vec<String>,

    #[arg(long)]
    pub clear_attachments: bool,
}

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Ticket id.
    pub id: String,

    /// Assignee id or email. Defaults to the acting user.
    #[arg(long, conflicts_with = "unassign")]
    pub to: Option<String>,

    /// Clear the assignee.
    #[arg(long)]
    pub unassign: bool,
}

/// The ticket's creator or any staff member may edit it.
fn may_edit(user: &User, ticket: &Ticket) -> Result<(), ActorError> {
    if ticket.created_by == user.id {
        Ok(())
    } else {
        actor::require_staff(user, "edit other users' tickets")
    }
}

fn render_ticket(output: OutputMode, ticket: &Ticket, headline: &str) -> anyhow::Result<()> {
    render(output, ticket, |t, w| {
        writeln!(w, "{headline}")?;
        pretty_kv(w, "status", t.status.as_str())?;
        pretty_kv(w, "priority", t.priority.as_str())?;
        pretty_kv(w, "assignee", t.assigned_to.as_deref().unwrap_or("unassigned"))?;
        pretty_kv(w, "updated", t.updated_at.to_rfc3339())
    })
}

pub fn run_update(
    args: &UpdateArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    if let Some(subject) = args.subject.as_deref() {
        check_input(output, validate::validate_subject(subject))?;
    }
    if let Some(description) = args.description.as_deref() {
        check_input(output, validate::validate_description(description))?;
    }

    let mut ws = Workspace::open(project_root, output)?;
    let me = ws.actor(as_flag, output)?;
    let ticket = resolve_ticket(&ws.desk, &args.id, output)?.clone();
    check_actor(output, may_edit(&me, &ticket))?;
    if args.status.is_some() {
        check_actor(output, actor::require_staff(&me, "change ticket status"))?;
    }

    let category = match args.category.as_deref() {
        Some(reference) => Some(resolve_category(&ws.desk, reference, output)?.id),
        None => None,
    };
    let attachments = if args.clear_attachments {
        Some(Vec::new())
    } else if args.attachments.is_empty() {
        None
    } else {
        Some(args.attachments.clone())
    };

    let patch = TicketPatch {
        subject: args.subject.as_deref().map(|s| s.trim().to_string()),
        description: args.description.as_deref().map(|s| s.trim().to_string()),
        category,
        status: args.status,
        priority: args.priority,
        assigned_to: None,
        attachments,
    };
    if patch.is_empty() {
        return Err(fail(
            output,
            &CliError::with_details(
                "nothing to update",
                "Pass at least one field, e.g. --status resolved",
                "empty_update",
            ),
        ));
    }

    let updated = timing::timed("ticket.update", || ws.desk.update_ticket(&ticket.id, patch))
        .map_err(|e| desk_fail(output, &e))?;
    render_ticket(output, &updated, &format!("✓ Updated ticket {}", updated.id))
}

pub fn run_assign(
    args: &AssignArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut ws = Workspace::open(project_root, output)?;
    let me = ws.actor(as_flag, output)?;
    check_actor(output, actor::require_staff(&me, "assign tickets"))?;
    let ticket_id = resolve_ticket(&ws.desk, &args.id, output)?.id.clone();

    let (patch, headline) = if args.unassign {
        (
            TicketPatch {
                assigned_to: Some(None),
                ..TicketPatch::default()
            },
            format!("✓ Unassigned ticket {ticket_id}"),
        )
    } else {
        let assignee = match args.to.as_deref() {
            Some(reference) => resolve_user(&ws.desk, reference, output)?,
            None => me.clone(),
        };
        check_actor(output, actor::require_staff(&assignee, "own tickets"))?;
        (
            TicketPatch::assign(&assignee.id),
            format!("✓ Assigned ticket {ticket_id} to {}", assignee.name),
        )
    };

    let updated = ws
        .desk
        .update_ticket(&ticket_id, patch)
        .map_err(|e| desk_fail(output, &e))?;
    render_ticket(output, &updated, &headline)
}
