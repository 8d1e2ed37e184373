//! `qd create` — open a new ticket.

use std::io::Write;
use std::path::Path;

use clap::Args;
use quickdesk_core::model::{NewTicket, Priority};

use crate::cmd::category::resolve_category;
use crate::cmd::{Workspace, check_input, desk_fail};
use crate::output::{OutputMode, pretty_kv, render};
use crate::validate;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// One-line summary.
    #[arg(short, long)]
    pub subject: String,

    /// What happened, and what you expected.
    #[arg(short, long)]
    pub description: String,

    /// Category id or name.
    #[arg(short, long)]
    pub category: String,

    /// low, medium, high or urgent.
    #[arg(short, long, default_value = "medium")]
    pub priority: Priority,

    /// Attachment file name (repeatable). Only the name is recorded.
    #[arg(short, long = "attachment")]
    pub attachments: Vec<String>,
}

pub fn run_create(
    args: &CreateArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    check_input(output, validate::validate_subject(&args.subject))?;
    check_input(output, validate::validate_description(&args.description))?;

    let mut ws = Workspace::open(project_root, output)?;
    let actor = ws.actor(as_flag, output)?;
    let category = resolve_category(&ws.desk, &args.category, output)?;

    let mut data = NewTicket::open(
        args.subject.trim(),
        args.description.trim(),
        category.id.clone(),
        args.priority,
        actor.id.clone(),
    );
    data.attachments.clone_from(&args.attachments);

    let ticket = ws.desk.create_ticket(data).map_err(|e| desk_fail(output, &e))?;
    render(output, &ticket, |t, w| {
        writeln!(w, "✓ Created ticket {}: {}", t.id, t.subject)?;
        pretty_kv(w, "category", &category.name)?;
        pretty_kv(w, "priority", t.priority.as_str())?;
        pretty_kv(w, "status", t.status.as_str())
    })
}
