//! `qd comment` and `qd comments` — add to and read a ticket's thread.

use std::io::Write;
use std::path::Path;

use clap::{Args, Subcommand};
use quickdesk_core::model::{Comment, NewComment, Ticket, User};
use quickdesk_core::view;
use serde::Serialize;

use crate::actor::{self, ActorError};
use crate::cmd::show::{can_see_internal, resolve_ticket, write_comment};
use crate::cmd::{Workspace, check_actor, check_input, desk_fail};
use crate::output::{OutputMode, pretty_section, render, render_mode};
use crate::validate;

#[derive(Args, Debug)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommand,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    #[command(
        about = "Add a comment to a ticket",
        after_help = "EXAMPLES:\n    # Reply on your own ticket\n    qd comment add 2 \"Still crashing after reinstall\"\n\n    # Staff-only note\n    qd --as agent@quickdesk.com comment add 2 \"Repro on build 412\" --internal"
    )]
    Add(CommentAddArgs),
}

#[derive(Args, Debug)]
pub struct CommentAddArgs {
    /// Ticket id.
    pub id: String,

    /// Comment body.
    pub body: String,

    /// Hide the comment from end users (support agents and admins only).
    #[arg(long)]
    pub internal: bool,
}

#[derive(Args, Debug)]
pub struct CommentsArgs {
    /// Ticket id.
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentsOutput<'a> {
    ticket_id: &'a str,
    comments: Vec<&'a Comment>,
}

/// The ticket's creator and staff may join its thread.
fn may_comment(user: &User, ticket: &Ticket) -> Result<(), ActorError> {
    if ticket.created_by == user.id {
        Ok(())
    } else {
        actor::require_staff(user, "comment on other users' tickets")
    }
}

pub fn run_comment(
    args: &CommentArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        CommentCommand::Add(add) => run_comment_add(add, as_flag, output, project_root),
    }
}

fn run_comment_add(
    args: &CommentAddArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut ws = Workspace::open(project_root, output)?;
    check_input(
        output,
        validate::validate_comment(&args.body, ws.config.comments.max_chars),
    )?;

    let me = ws.actor(as_flag, output)?;
    let ticket = resolve_ticket(&ws.desk, &args.id, output)?;
    check_actor(output, may_comment(&me, ticket))?;
    if args.internal {
        check_actor(output, actor::require_staff(&me, "post internal comments"))?;
    }

    let mut data = NewComment::by(&me, ticket.id.clone(), args.body.trim());
    if args.internal {
        data = data.internal();
    }
    let comment = ws.desk.add_comment(data).map_err(|e| desk_fail(output, &e))?;

    render(output, &comment, |c, w| {
        writeln!(w, "✓ Comment {} added to ticket {}", c.id, c.ticket_id)?;
        write_comment(w, c)
    })
}

pub fn run_comments(
    args: &CommentsArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ws = Workspace::open(project_root, output)?;
    let viewer = ws.optional_actor(as_flag, output)?;
    let ticket = resolve_ticket(&ws.desk, &args.id, output)?;

    let thread = CommentsOutput {
        ticket_id: &ticket.id,
        comments: view::ticket_comments(
            ws.desk.comments(),
            &ticket.id,
            can_see_internal(viewer.as_ref()),
        ),
    };

    render_mode(
        output,
        &thread,
        |t, w| {
            for c in &t.comments {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    c.created_at.to_rfc3339(),
                    c.user_id,
                    c.user_role,
                    if c.is_internal { "internal" } else { "public" },
                    c.content.replace('\n', "\\n"),
                )?;
            }
            Ok(())
        },
        |t, w| {
            pretty_section(w, &format!("Ticket #{} comments ({})", t.ticket_id, t.comments.len()))?;
            if t.comments.is_empty() {
                return writeln!(w, "No comments yet.");
            }
            for (i, c) in t.comments.iter().enumerate() {
                if i > 0 {
                    writeln!(w)?;
                }
                write_comment(w, c)?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use quickdesk_core::Desk;
    use quickdesk_core::store::MemoryStore;

    #[derive(Parser)]
    struct Wrapper {
        #[command(subcommand)]
        command: CommentCommand,
    }

    #[test]
    fn add_parses_internal_flag() {
        let w = Wrapper::parse_from(["test", "add", "2", "hello", "--internal"]);
        let CommentCommand::Add(add) = w.command;
        assert_eq!(add.id, "2");
        assert!(add.internal);
    }

    #[test]
    fn only_creator_or_staff_comment() {
        let desk = Desk::open(MemoryStore::new()).expect("open");
        let ticket = desk.ticket("1").expect("ticket");
        assert!(may_comment(desk.user("3").expect("creator"), ticket).is_ok());
        assert!(may_comment(desk.user("1").expect("admin"), ticket).is_ok());

        let mut other = desk.user("3").cloned().expect("user");
        other.id = "42".to_string();
        assert!(may_comment(&other, ticket).is_err());
    }
}
