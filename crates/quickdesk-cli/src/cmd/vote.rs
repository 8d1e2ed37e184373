//! `qd vote` — up- or downvote a ticket.

use std::io::Write;
use std::path::Path;

use clap::Args;
use quickdesk_core::model::VoteKind;
use serde::Serialize;

use crate::cmd::show::resolve_ticket;
use crate::cmd::{Workspace, desk_fail};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct VoteArgs {
    /// Ticket id.
    pub id: String,

    /// `up` or `down`. Voting the other way switches your vote; voting the
    /// same way again changes nothing.
    pub direction: VoteKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteOutput {
    ok: bool,
    ticket_id: String,
    user_id: String,
    vote: VoteKind,
    /// The vote held before this command, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    previous: Option<VoteKind>,
    upvotes: usize,
    downvotes: usize,
    net_votes: i64,
}

pub fn run_vote(
    args: &VoteArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut ws = Workspace::open(project_root, output)?;
    let me = ws.actor(as_flag, output)?;
    let ticket = resolve_ticket(&ws.desk, &args.id, output)?;
    let previous = ticket.vote_of(&me.id);
    let ticket_id = ticket.id.clone();

    let updated = ws
        .desk
        .vote_ticket(&ticket_id, &me.id, args.direction)
        .map_err(|e| desk_fail(output, &e))?;

    let report = VoteOutput {
        ok: true,
        ticket_id,
        user_id: me.id,
        vote: args.direction,
        previous,
        upvotes: updated.upvotes.len(),
        downvotes: updated.downvotes.len(),
        net_votes: updated.net_votes(),
    };
    render(output, &report, |r, w| {
        let verb = match r.previous {
            Some(prev) if prev == r.vote => "Kept",
            Some(_) => "Switched to",
            None => "Recorded",
        };
        writeln!(
            w,
            "✓ {verb} {} on ticket {} (net {:+}: {} up, {} down)",
            r.vote, r.ticket_id, r.net_votes, r.upvotes, r.downvotes
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: VoteArgs,
    }

    #[test]
    fn direction_accepts_short_forms() {
        let w = Wrapper::parse_from(["test", "2", "up"]);
        assert_eq!(w.args.direction, VoteKind::Upvote);
        let w = Wrapper::parse_from(["test", "2", "downvote"]);
        assert_eq!(w.args.direction, VoteKind::Downvote);
        assert!(Wrapper::try_parse_from(["test", "2", "sideways"]).is_err());
    }
}
