//! Derived, non-persisted views over the desk collections.
//!
//! Everything here is a pure function of borrowed records and query
//! parameters, recomputed on each call.

use anyhow::{Result, bail};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::model::{Category, Comment, Priority, Role, Status, Ticket, User};

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Sort order for ticket listings. All orders are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recently updated first.
    #[default]
    Recent,
    /// Oldest created first.
    Oldest,
    /// Newest created first.
    Newest,
    /// urgent > high > medium > low.
    Priority,
    /// Highest `upvotes - downvotes` first.
    Votes,
    /// Collection order (most recently created first).
    Insertion,
}

impl SortOrder {
    fn sort(self, tickets: &mut [&Ticket]) {
        match self {
            Self::Recent => tickets.sort_by_key(|t| Reverse(t.updated_at)),
            Self::Oldest => tickets.sort_by_key(|t| t.created_at),
            Self::Newest => tickets.sort_by_key(|t| Reverse(t.created_at)),
            Self::Priority => tickets.sort_by_key(|t| Reverse(t.priority.rank())),
            Self::Votes => tickets.sort_by_key(|t| Reverse(t.net_votes())),
            Self::Insertion => {}
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recent => f.write_str("recent"),
            Self::Oldest => f.write_str("oldest"),
            Self::Newest => f.write_str("newest"),
            Self::Priority => f.write_str("priority"),
            Self::Votes => f.write_str("votes"),
            Self::Insertion => f.write_str("insertion"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recent" | "updated" | "updated_desc" | "updated-desc" => Ok(Self::Recent),
            "oldest" | "created_asc" | "created-asc" => Ok(Self::Oldest),
            "newest" | "created_desc" | "created-desc" => Ok(Self::Newest),
            "priority" | "triage" => Ok(Self::Priority),
            "votes" | "score" | "popular" => Ok(Self::Votes),
            "insertion" | "none" | "default" => Ok(Self::Insertion),
            other => bail!(
                "unknown sort order '{other}': expected one of recent, oldest, newest, priority, votes, insertion"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Filter criteria for ticket listings.
///
/// All fields are optional. When multiple fields are set, they are combined
/// with AND semantics.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Case-insensitive substring of subject or description.
    pub search: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    /// Category id (exact match).
    pub category: Option<String>,
    /// Creator user id (an end user's "my tickets").
    pub created_by: Option<String>,
    /// Assignee user id (an agent's queue).
    pub assigned_to: Option<String>,
}

impl TicketFilter {
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if let Some(needle) = self.search.as_deref() {
            let needle = needle.to_lowercase();
            if !needle.is_empty()
                && !ticket.subject.to_lowercase().contains(&needle)
                && !ticket.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != ticket.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != ticket.priority) {
            return false;
        }
        if self
            .category
            .as_deref()
            .is_some_and(|c| c != ticket.category)
        {
            return false;
        }
        if self
            .created_by
            .as_deref()
            .is_some_and(|u| u != ticket.created_by)
        {
            return false;
        }
        if let Some(assignee) = self.assigned_to.as_deref() {
            if ticket.assigned_to.as_deref() != Some(assignee) {
                return false;
            }
        }
        true
    }
}

/// Filter then sort `tickets`.
#[must_use]
pub fn list_tickets<'a>(
    tickets: &'a [Ticket],
    filter: &TicketFilter,
    sort: SortOrder,
) -> Vec<&'a Ticket> {
    let mut matched: Vec<&Ticket> = tickets.iter().filter(|t| filter.matches(t)).collect();
    sort.sort(&mut matched);
    matched
}

/// Comments on `ticket_id`, oldest first. Internal notes are dropped unless
/// `include_internal` is set.
#[must_use]
pub fn ticket_comments<'a>(
    comments: &'a [Comment],
    ticket_id: &str,
    include_internal: bool,
) -> Vec<&'a Comment> {
    let mut thread: Vec<&Comment> = comments
        .iter()
        .filter(|c| c.ticket_id == ticket_id && (include_internal || !c.is_internal))
        .collect();
    thread.sort_by_key(|c| c.created_at);
    thread
}

/// Look up a ticket's category; a deleted category yields `None`.
#[must_use]
pub fn category_of<'a>(categories: &'a [Category], ticket: &Ticket) -> Option<&'a Category> {
    categories.iter().find(|c| c.id == ticket.category)
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub closed: usize,
}

impl StatusCounts {
    pub fn tally<'a>(tickets: impl IntoIterator<Item = &'a Ticket>) -> Self {
        let mut counts = Self::default();
        for ticket in tickets {
            counts.total += 1;
            match ticket.status {
                Status::Open => counts.open += 1,
                Status::InProgress => counts.in_progress += 1,
                Status::Resolved => counts.resolved += 1,
                Status::Closed => counts.closed += 1,
            }
        }
        counts
    }

    #[must_use]
    pub const fn get(&self, status: Status) -> usize {
        match status {
            Status::Open => self.open,
            Status::InProgress => self.in_progress,
            Status::Resolved => self.resolved,
            Status::Closed => self.closed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub urgent: usize,
}

impl PriorityCounts {
    pub fn tally<'a>(tickets: impl IntoIterator<Item = &'a Ticket>) -> Self {
        let mut counts = Self::default();
        for ticket in tickets {
            match ticket.priority {
                Priority::Low => counts.low += 1,
                Priority::Medium => counts.medium += 1,
                Priority::High => counts.high += 1,
                Priority::Urgent => counts.urgent += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub admin: usize,
    pub support_agent: usize,
    pub end_user: usize,
}

impl RoleCounts {
    pub fn tally<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        let mut counts = Self::default();
        for user in users {
            match user.role {
                Role::Admin => counts.admin += 1,
                Role::SupportAgent => counts.support_agent += 1,
                Role::EndUser => counts.end_user += 1,
            }
        }
        counts
    }
}

/// Ticket count per category id, including categories with no tickets.
/// Tickets whose category was deleted are counted under their dangling id.
#[must_use]
pub fn category_ticket_counts(
    categories: &[Category],
    tickets: &[Ticket],
) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> =
        categories.iter().map(|c| (c.id.clone(), 0)).collect();
    for ticket in tickets {
        *counts.entry(ticket.category.clone()).or_default() += 1;
    }
    counts
}

/// Whole-desk overview for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeskStats {
    pub tickets: StatusCounts,
    pub priorities: PriorityCounts,
    pub users: usize,
    pub roles: RoleCounts,
    pub categories: usize,
    pub comments: usize,
    pub by_category: BTreeMap<String, usize>,
}

#[must_use]
pub fn desk_stats(
    tickets: &[Ticket],
    users: &[User],
    categories: &[Category],
    comments: &[Comment],
) -> DeskStats {
    DeskStats {
        tickets: StatusCounts::tally(tickets),
        priorities: PriorityCounts::tally(tickets),
        users: users.len(),
        roles: RoleCounts::tally(users),
        categories: categories.len(),
        comments: comments.len(),
        by_category: category_ticket_counts(categories, tickets),
    }
}

/// A support agent's queue summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentQueue {
    pub total: usize,
    pub assigned: usize,
    pub open: usize,
    pub in_progress: usize,
}

#[must_use]
pub fn agent_queue(tickets: &[Ticket], agent_id: &str) -> AgentQueue {
    let all = StatusCounts::tally(tickets);
    AgentQueue {
        total: all.total,
        assigned: tickets
            .iter()
            .filter(|t| t.assigned_to.as_deref() == Some(agent_id))
            .count(),
        open: all.open,
        in_progress: all.in_progress,
    }
}
