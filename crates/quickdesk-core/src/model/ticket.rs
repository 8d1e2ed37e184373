use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, Record, normalize};

/// The four ticket lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Closed];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Open and in-progress tickets still need an agent's attention.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }
}

/// Ticket priority, ordered `Low < Medium < High < Urgent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Sort rank: urgent=4, high=3, medium=2, low=1.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Urgent => 4,
        }
    }
}

/// Direction of a ticket vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl VoteKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
        }
    }
}

/// A support request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub description: String,
    /// Category id. May dangle after the category is deleted.
    pub category: String,
    pub status: Status,
    pub priority: Priority,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub upvotes: Vec<String>,
    #[serde(default)]
    pub downvotes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl Record for Ticket {
    const COLLECTION: &'static str = "quickdesk_tickets";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Ticket {
    /// `upvotes - downvotes`.
    #[must_use]
    pub fn net_votes(&self) -> i64 {
        let up = i64::try_from(self.upvotes.len()).unwrap_or(i64::MAX);
        let down = i64::try_from(self.downvotes.len()).unwrap_or(i64::MAX);
        up - down
    }

    /// The vote `user_id` currently holds on this ticket, if any.
    #[must_use]
    pub fn vote_of(&self, user_id: &str) -> Option<VoteKind> {
        if self.upvotes.iter().any(|id| id == user_id) {
            Some(VoteKind::Upvote)
        } else if self.downvotes.iter().any(|id| id == user_id) {
            Some(VoteKind::Downvote)
        } else {
            None
        }
    }

    /// Record `user_id`'s vote, replacing any earlier vote by the same user.
    ///
    /// The user is first removed from both sets and then appended to the set
    /// for `kind`, so repeating a vote leaves membership unchanged rather than
    /// toggling it off.
    pub fn cast_vote(&mut self, user_id: &str, kind: VoteKind) {
        self.upvotes.retain(|id| id != user_id);
        self.downvotes.retain(|id| id != user_id);

        match kind {
            VoteKind::Upvote => self.upvotes.push(user_id.to_string()),
            VoteKind::Downvote => self.downvotes.push(user_id.to_string()),
        }
    }

    /// Merge the set fields of `patch` into this ticket. Timestamps are the
    /// caller's responsibility.
    pub fn apply(&mut self, patch: TicketPatch) {
        if let Some(subject) = patch.subject {
            self.subject = subject;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(attachments) = patch.attachments {
            self.attachments = attachments;
        }
    }
}

/// Caller-supplied fields for a new ticket; id, timestamps and vote sets are
/// assigned by the desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub category: String,
    pub status: Status,
    pub priority: Priority,
    pub created_by: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl NewTicket {
    /// An open, unassigned ticket.
    #[must_use]
    pub fn open(
        subject: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        priority: Priority,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            description: description.into(),
            category: category.into(),
            status: Status::Open,
            priority,
            created_by: created_by.into(),
            assigned_to: None,
            attachments: Vec::new(),
        }
    }
}

/// Partial update for a ticket. `None` leaves the field unchanged;
/// `assigned_to: Some(None)` clears the assignee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketPatch {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Option<String>>,
    pub attachments: Option<Vec<String>>,
}

impl TicketPatch {
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn assign(user_id: impl Into<String>) -> Self {
        Self {
            assigned_to: Some(Some(user_id.into())),
            ..Self::default()
        }
    }

    /// True when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.attachments.is_none()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "open" => Ok(Self::Open),
            "in_progress" | "inprogress" | "doing" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for VoteKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "up" | "upvote" | "+" | "+1" => Ok(Self::Upvote),
            "down" | "downvote" | "-" | "-1" => Ok(Self::Downvote),
            _ => Err(ParseEnumError {
                expected: "vote",
                got: s.to_string(),
            }),
        }
    }
}
