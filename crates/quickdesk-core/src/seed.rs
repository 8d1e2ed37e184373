//! Demo records written when a collection has never been stored.

use chrono::{DateTime, Utc};

use crate::model::{Category, Comment, Priority, Role, Status, Ticket, User};

fn ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |dt| dt.with_timezone(&Utc))
}

fn user(id: &str, email: &str, name: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        role,
        avatar: None,
        created_at: ts("2024-01-01T00:00:00Z"),
    }
}

fn category(id: &str, name: &str, description: &str, color: &str) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        color: color.to_string(),
        created_at: ts("2024-01-01T00:00:00Z"),
    }
}

/// One admin, one support agent, one end user.
#[must_use]
pub fn users() -> Vec<User> {
    vec![
        user("1", "admin@quickdesk.com", "Admin User", Role::Admin),
        user("2", "agent@quickdesk.com", "Support Agent", Role::SupportAgent),
        user("3", "user@quickdesk.com", "End User", Role::EndUser),
    ]
}

#[must_use]
pub fn categories() -> Vec<Category> {
    vec![
        category("1", "Technical Issue", "Hardware or software problems", "#EF4444"),
        category("2", "Account Access", "Login and account related issues", "#3B82F6"),
        category("3", "General Inquiry", "General questions and information", "#10B981"),
        category("4", "Feature Request", "New feature suggestions", "#F59E0B"),
    ]
}

#[must_use]
pub fn tickets() -> Vec<Ticket> {
    vec![
        Ticket {
            id: "1".to_string(),
            subject: "Unable to access my account".to_string(),
            description: "I forgot my password and the reset email is not arriving".to_string(),
            category: "2".to_string(),
            status: Status::Open,
            priority: Priority::High,
            created_by: "3".to_string(),
            assigned_to: None,
            created_at: ts("2024-01-15T10:30:00Z"),
            updated_at: ts("2024-01-15T10:30:00Z"),
            upvotes: Vec::new(),
            downvotes: Vec::new(),
            attachments: Vec::new(),
        },
        Ticket {
            id: "2".to_string(),
            subject: "Application crashes on startup".to_string(),
            description: "The application crashes immediately when I try to open it. \
                          This started happening after the latest update."
                .to_string(),
            category: "1".to_string(),
            status: Status::InProgress,
            priority: Priority::Urgent,
            created_by: "3".to_string(),
            assigned_to: Some("2".to_string()),
            created_at: ts("2024-01-14T14:20:00Z"),
            updated_at: ts("2024-01-15T09:15:00Z"),
            upvotes: vec!["3".to_string()],
            downvotes: Vec::new(),
            attachments: Vec::new(),
        },
    ]
}

#[must_use]
pub fn comments() -> Vec<Comment> {
    vec![Comment {
        id: "1".to_string(),
        ticket_id: "2".to_string(),
        user_id: "2".to_string(),
        user_name: "Support Agent".to_string(),
        user_role: Role::SupportAgent,
        content: "Thank you for reporting this issue. I've escalated this to our development \
                  team and we're working on a fix."
            .to_string(),
        created_at: ts("2024-01-15T09:15:00Z"),
        is_internal: false,
    }]
}
