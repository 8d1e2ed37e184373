//! Persisted record types.
//!
//! Field names serialize in camelCase and enum values in `snake_case`, which
//! is the layout every stored collection blob uses.

pub mod category;
pub mod comment;
pub mod ticket;
pub mod user;

use std::fmt;

pub use category::{Category, CategoryPatch, NewCategory};
pub use comment::{Comment, NewComment};
pub use ticket::{NewTicket, Priority, Status, Ticket, TicketPatch, VoteKind};
pub use user::{NewUser, Role, User, UserPatch};

/// A record addressable by a collection-unique identifier.
pub trait Record {
    /// Storage key of the collection holding this record type.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('-', "_")
}
