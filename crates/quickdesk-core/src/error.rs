use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Machine-readable error codes for scripts and agents driving `qd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    TicketNotFound,
    CategoryNotFound,
    UserNotFound,
    DuplicateEmail,
    InvalidEnumValue,
    CorruptCollection,
    StoreWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::TicketNotFound => "E2001",
            Self::CategoryNotFound => "E2002",
            Self::UserNotFound => "E2003",
            Self::DuplicateEmail => "E2004",
            Self::InvalidEnumValue => "E2005",
            Self::CorruptCollection => "E3001",
            Self::StoreWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Desk not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::TicketNotFound => "Ticket not found",
            Self::CategoryNotFound => "Category not found",
            Self::UserNotFound => "User not found",
            Self::DuplicateEmail => "Email already registered",
            Self::InvalidEnumValue => "Invalid status/priority/role value",
            Self::CorruptCollection => "Corrupt collection blob",
            Self::StoreWriteFailed => "Store write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `qd init` to create a .quickdesk directory."),
            Self::ConfigParseError => Some("Fix syntax in .quickdesk/config.toml and retry."),
            Self::TicketNotFound => Some("Check the ticket ID with `qd list`."),
            Self::CategoryNotFound => Some("Check the category ID with `qd category list`."),
            Self::UserNotFound => Some("Check the user ID or email with `qd user list`."),
            Self::DuplicateEmail => Some("Log in with `qd login <email>` instead."),
            Self::InvalidEnumValue => {
                Some("Use one of the documented status/priority/role values.")
            }
            Self::CorruptCollection => {
                Some("Repair or delete the named .json file under .quickdesk/ to reseed it.")
            }
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `qd` process releases its lock."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The identifier-keyed collections that can report a missing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Ticket,
    Category,
    User,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Category => "category",
            Self::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures from a blob store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {waited:?} waiting for the store lock in {}", dir.display())]
    LockTimeout { dir: PathBuf, waited: Duration },
}

impl StoreError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::StoreWriteFailed,
            Self::LockTimeout { .. } => ErrorCode::LockContention,
        }
    }
}

/// Errors surfaced by [`Desk`](crate::desk::Desk) operations.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("a user with email '{email}' already exists")]
    DuplicateEmail { email: String },

    #[error("collection '{key}' is not valid JSON for its record type: {source}")]
    CorruptBlob {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode collection '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DeskError {
    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { kind, .. } => match kind {
                EntityKind::Ticket => ErrorCode::TicketNotFound,
                EntityKind::Category => ErrorCode::CategoryNotFound,
                EntityKind::User => ErrorCode::UserNotFound,
            },
            Self::DuplicateEmail { .. } => ErrorCode::DuplicateEmail,
            Self::CorruptBlob { .. } => ErrorCode::CorruptCollection,
            Self::Encode { .. } => ErrorCode::InternalUnexpected,
            Self::Store(err) => err.error_code(),
        }
    }

    /// Remediation text, falling back to the code's summary.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.error_code();
        code.hint().unwrap_or_else(|| code.message()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{DeskError, EntityKind, ErrorCode};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::TicketNotFound,
            ErrorCode::CategoryNotFound,
            ErrorCode::UserNotFound,
            ErrorCode::DuplicateEmail,
            ErrorCode::InvalidEnumValue,
            ErrorCode::CorruptCollection,
            ErrorCode::StoreWriteFailed,
            ErrorCode::LockContention,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::TicketNotFound.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn not_found_maps_kind_to_code() {
        let err = DeskError::not_found(EntityKind::Category, "42");
        assert_eq!(err.error_code(), ErrorCode::CategoryNotFound);
        assert_eq!(err.to_string(), "category '42' not found");
        assert!(err.suggestion().contains("qd category list"));
    }
}
