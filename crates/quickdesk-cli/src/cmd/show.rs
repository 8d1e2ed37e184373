//! `qd show` — full detail for one ticket.

use std::io::Write;
use std::path::Path;

use clap::Args;
use quickdesk_core::Desk;
use quickdesk_core::error::{DeskError, EntityKind};
use quickdesk_core::model::{Comment, Ticket, User, VoteKind};
use quickdesk_core::store::BlobStore;
use quickdesk_core::view;
use serde::Serialize;

use crate::cmd::{Workspace, desk_fail};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Ticket id.
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowOutput<'a> {
    #[serde(flatten)]
    ticket: &'a Ticket,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_by_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned_to_name: Option<&'a str>,
    net_votes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    my_vote: Option<VoteKind>,
    comments: Vec<&'a Comment>,
}

/// Look up a ticket, reporting an unknown id as not found.
pub fn resolve_ticket<'a, S: BlobStore>(
    desk: &'a Desk<S>,
    id: &str,
    output: OutputMode,
) -> anyhow::Result<&'a Ticket> {
    let id = id.trim();
    desk.ticket(id).ok_or_else(|| {
        desk_fail(
            output,
            &DeskError::NotFound {
                kind: EntityKind::Ticket,
                id: id.to_string(),
            },
        )
    })
}

/// Internal notes are for staff eyes only.
pub fn can_see_internal(viewer: Option<&User>) -> bool {
    viewer.is_some_and(|u| u.role.is_staff())
}

/// One comment block for human output.
pub fn write_comment(w: &mut dyn Write, c: &Comment) -> std::io::Result<()> {
    let badge = if c.is_internal { " [internal]" } else { "" };
    writeln!(
        w,
        "{} ({}) {}{badge}",
        c.user_name,
        c.user_role,
        c.created_at.format("%Y-%m-%d %H:%M")
    )?;
    for line in c.content.lines() {
        writeln!(w, "  {line}")?;
    }
    Ok(())
}

pub fn run_show(
    args: &ShowArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ws = Workspace::open(project_root, output)?;
    let viewer = ws.optional_actor(as_flag, output)?;
    let ticket = resolve_ticket(&ws.desk, &args.id, output)?;

    let detail = ShowOutput {
        ticket,
        category_name: view::category_of(ws.desk.categories(), ticket).map(|c| c.name.as_str()),
        created_by_name: ws.desk.user(&ticket.created_by).map(|u| u.name.as_str()),
        assigned_to_name: ticket
            .assigned_to
            .as_deref()
            .and_then(|id| ws.desk.user(id))
            .map(|u| u.name.as_str()),
        net_votes: ticket.net_votes(),
        my_vote: viewer.as_ref().and_then(|u| ticket.vote_of(&u.id)),
        comments: view::ticket_comments(
            ws.desk.comments(),
            &ticket.id,
            can_see_internal(viewer.as_ref()),
        ),
    };

    render_mode(
        output,
        &detail,
        |d, w| {
            let t = d.ticket;
            writeln!(w, "{}\t{}\t{}\t{}", t.id, t.status, t.priority, t.subject)?;
            writeln!(w, "category\t{}", d.category_name.unwrap_or(&t.category))?;
            writeln!(w, "created_by\t{}", t.created_by)?;
            writeln!(w, "assigned_to\t{}", t.assigned_to.as_deref().unwrap_or("-"))?;
            writeln!(w, "votes\t{}\t+{}\t-{}", d.net_votes, t.upvotes.len(), t.downvotes.len())?;
            writeln!(w, "comments\t{}", d.comments.len())?;
            writeln!(w)?;
            writeln!(w, "{}", t.description)
        },
        |d, w| {
            let t = d.ticket;
            pretty_section(w, &format!("Ticket #{}: {}", t.id, t.subject))?;
            pretty_kv(w, "status", t.status.as_str())?;
            pretty_kv(w, "priority", t.priority.as_str())?;
            pretty_kv(w, "category", d.category_name.unwrap_or("(uncategorized)"))?;
            pretty_kv(w, "opened by", d.created_by_name.unwrap_or(&t.created_by))?;
            pretty_kv(
                w,
                "assignee",
                match (t.assigned_to.as_deref(), d.assigned_to_name) {
                    (None, _) => "unassigned",
                    (Some(_), Some(name)) | (Some(name), None) => name,
                },
            )?;
            pretty_kv(
                w,
                "votes",
                format!("{:+} ({} up, {} down)", d.net_votes, t.upvotes.len(), t.downvotes.len()),
            )?;
            if let Some(vote) = d.my_vote {
                pretty_kv(w, "your vote", vote.as_str())?;
            }
            pretty_kv(w, "created", t.created_at.to_rfc3339())?;
            pretty_kv(w, "updated", t.updated_at.to_rfc3339())?;
            if !t.attachments.is_empty() {
                pretty_kv(w, "attachments", t.attachments.join(", "))?;
            }
            writeln!(w)?;
            writeln!(w, "{}", t.description)?;
            writeln!(w)?;
            pretty_section(w, &format!("Comments ({})", d.comments.len()))?;
            for (i, c) in d.comments.iter().enumerate() {
                if i > 0 {
                    writeln!(w)?;
                }
                write_comment(w, c)?;
            }
            if !d.comments.is_empty() {
                pretty_rule(w)?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickdesk_core::store::MemoryStore;

    #[test]
    fn internal_visibility_follows_role() {
        let desk = Desk::open(MemoryStore::new()).expect("open");
        assert!(can_see_internal(desk.user("1")));
        assert!(can_see_internal(desk.user("2")));
        assert!(!can_see_internal(desk.user("3")));
        assert!(!can_see_internal(None));
    }

    #[test]
    fn detail_json_flattens_ticket() {
        let desk = Desk::open(MemoryStore::new()).expect("open");
        let ticket = desk.ticket("2").expect("seeded ticket");
        let detail = ShowOutput {
            ticket,
            category_name: Some("Technical Issue"),
            created_by_name: None,
            assigned_to_name: Some("Support Agent"),
            net_votes: ticket.net_votes(),
            my_vote: ticket.vote_of("3"),
            comments: Vec::new(),
        };
        let value = serde_json::to_value(&detail).expect("json");
        assert_eq!(value["id"], "2");
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["categoryName"], "Technical Issue");
        assert_eq!(value["netVotes"], 1);
        assert_eq!(value["myVote"], "upvote");
        assert!(value.get("createdByName").is_none());
    }

    #[test]
    fn comment_block_marks_internal() {
        let desk = Desk::open(MemoryStore::new()).expect("open");
        let mut comment = desk.comments()[0].clone();
        comment.is_internal = true;
        let mut buf = Vec::new();
        write_comment(&mut buf, &comment).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("Support Agent (support_agent)"));
        assert!(text.contains("[internal]"));
    }
}
