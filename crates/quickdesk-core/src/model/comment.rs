use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, Role, User};

/// A note on a ticket. Author name and role are snapshotted at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub ticket_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Staff-only notes, hidden from end users.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_internal: bool,
}

impl Record for Comment {
    const COLLECTION: &'static str = "quickdesk_comments";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub ticket_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_role: Role,
    pub content: String,
    pub is_internal: bool,
}

impl NewComment {
    /// A public comment by `author`, snapshotting their name and role.
    #[must_use]
    pub fn by(author: &User, ticket_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            user_id: author.id.clone(),
            user_name: author.name.clone(),
            user_role: author.role,
            content: content.into(),
            is_internal: false,
        }
    }

    #[must_use]
    pub fn internal(mut self) -> Self {
        self.is_internal = true;
        self
    }
}
