//! Acting-user resolution for CLI commands.
//!
//! The resolution chain: `--as` flag > `QUICKDESK_USER` env > stored login
//! session. Flag and env values may be a user id or an email address.
//! Commands that read shared data work without an actor; anything that
//! records authorship requires one.

use std::env;

use quickdesk_core::Desk;
use quickdesk_core::auth;
use quickdesk_core::error::ErrorCode;
use quickdesk_core::model::{Role, User};
use quickdesk_core::store::BlobStore;

use crate::output::CliError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorError {
    pub message: String,
    pub suggestion: &'static str,
    pub code: &'static str,
}

impl std::fmt::Display for ActorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActorError {}

impl ActorError {
    pub fn to_cli_error(&self) -> CliError {
        CliError::with_details(&self.message, self.suggestion, self.code)
    }
}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Where an explicit identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Flag,
    Env,
}

fn explicit_identity(flag: Option<&str>, env: &dyn EnvReader) -> Option<(String, Source)> {
    if let Some(value) = flag.map(str::trim).filter(|v| !v.is_empty()) {
        return Some((value.to_string(), Source::Flag));
    }
    env.get("QUICKDESK_USER")
        .map(|value| (value.trim().to_string(), Source::Env))
}

fn lookup<S: BlobStore>(desk: &Desk<S>, reference: &str) -> Option<User> {
    desk.user(reference)
        .or_else(|| desk.user_by_email(reference))
        .cloned()
}

fn resolve_with<S: BlobStore>(
    desk: &Desk<S>,
    flag: Option<&str>,
    env: &dyn EnvReader,
) -> Result<Option<User>, ActorError> {
    if let Some((reference, source)) = explicit_identity(flag, env) {
        return lookup(desk, &reference).map(Some).ok_or_else(|| ActorError {
            message: match source {
                Source::Flag => format!("--as '{reference}' does not match any user id or email"),
                Source::Env => {
                    format!("QUICKDESK_USER '{reference}' does not match any user id or email")
                }
            },
            suggestion: "List users with `qd user list`",
            code: ErrorCode::UserNotFound.code(),
        });
    }

    let session = auth::current_user(desk).map_err(|err| ActorError {
        message: err.to_string(),
        suggestion: "Run `qd logout` and log in again",
        code: err.error_code().code(),
    })?;

    // The session is a sign-in snapshot; prefer the live record so role
    // changes take effect without a fresh login.
    match session {
        None => Ok(None),
        Some(snapshot) => desk.user(&snapshot.id).cloned().map(Some).ok_or_else(|| ActorError {
            message: format!("logged-in user '{}' no longer exists", snapshot.email),
            suggestion: "Run `qd logout`, then `qd login <email>`",
            code: ErrorCode::UserNotFound.code(),
        }),
    }
}

/// The acting user, if any identity is configured.
pub fn resolve_actor<S: BlobStore>(
    desk: &Desk<S>,
    flag: Option<&str>,
) -> Result<Option<User>, ActorError> {
    resolve_with(desk, flag, &RealEnv)
}

/// The acting user; an error when nobody is signed in.
pub fn require_actor<S: BlobStore>(desk: &Desk<S>, flag: Option<&str>) -> Result<User, ActorError> {
    resolve_actor(desk, flag)?.ok_or_else(missing_actor)
}

fn missing_actor() -> ActorError {
    ActorError {
        message: "No acting user. Log in, or pass --as / set QUICKDESK_USER.".to_string(),
        suggestion: "Run `qd login <email>`",
        code: "missing_identity",
    }
}

/// Staff means support agents and admins.
pub fn require_staff(user: &User, action: &str) -> Result<(), ActorError> {
    if user.role.is_staff() {
        Ok(())
    } else {
        Err(denied(user, action, "support agents and admins"))
    }
}

pub fn require_admin(user: &User, action: &str) -> Result<(), ActorError> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(denied(user, action, "admins"))
    }
}

fn denied(user: &User, action: &str, who: &str) -> ActorError {
    ActorError {
        message: format!("{} ({}) may not {action}; only {who} can", user.email, user.role),
        suggestion: "Act as a user with the required role via --as",
        code: "permission_denied",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickdesk_core::auth::Authenticator;
    use quickdesk_core::model::UserPatch;
    use quickdesk_core::store::MemoryStore;
    use std::collections::HashMap;
    use std::time::Duration;

    struct MockEnv {
        vars: HashMap<String, String>,
    }

    impl MockEnv {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn var(mut self, key: &str, val: &str) -> Self {
            self.vars.insert(key.to_string(), val.to_string());
            self
        }
    }

    impl EnvReader for MockEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).filter(|v| !v.is_empty()).cloned()
        }
    }

    fn desk() -> Desk<MemoryStore> {
        Desk::open(MemoryStore::new()).expect("open")
    }

    #[test]
    fn flag_beats_env_and_session() {
        let mut desk = desk();
        Authenticator::new(Duration::ZERO)
            .login(&mut desk, "user@quickdesk.com")
            .expect("login");
        let env = MockEnv::new().var("QUICKDESK_USER", "2");

        let user = resolve_with(&desk, Some("admin@quickdesk.com"), &env)
            .expect("resolve")
            .expect("user");
        assert_eq!(user.id, "1");
    }

    #[test]
    fn env_beats_session() {
        let mut desk = desk();
        Authenticator::new(Duration::ZERO)
            .login(&mut desk, "user@quickdesk.com")
            .expect("login");
        let env = MockEnv::new().var("QUICKDESK_USER", "2");

        let user = resolve_with(&desk, None, &env).expect("resolve").expect("user");
        assert_eq!(user.role, Role::SupportAgent);
    }

    #[test]
    fn session_is_refreshed_from_live_record() {
        let mut desk = desk();
        Authenticator::new(Duration::ZERO)
            .login(&mut desk, "user@quickdesk.com")
            .expect("login");
        desk.update_user(
            "3",
            UserPatch {
                role: Some(Role::SupportAgent),
                ..UserPatch::default()
            },
        )
        .expect("promote");

        let user = resolve_with(&desk, None, &MockEnv::new())
            .expect("resolve")
            .expect("user");
        assert_eq!(user.role, Role::SupportAgent);
    }

    #[test]
    fn nobody_resolves_to_none() {
        let desk = desk();
        assert!(resolve_with(&desk, None, &MockEnv::new()).expect("resolve").is_none());
        assert!(resolve_with(&desk, Some("  "), &MockEnv::new()).expect("resolve").is_none());
    }

    #[test]
    fn unknown_reference_is_an_error() {
        let desk = desk();
        let err = resolve_with(&desk, Some("ghost@example.com"), &MockEnv::new())
            .expect_err("unknown");
        assert_eq!(err.code, "E2003");
        assert!(err.message.contains("--as"));
    }

    #[test]
    fn role_gates() {
        let desk = desk();
        let admin = desk.user("1").cloned().expect("admin");
        let agent = desk.user("2").cloned().expect("agent");
        let end_user = desk.user("3").cloned().expect("user");

        assert!(require_admin(&admin, "delete categories").is_ok());
        assert!(require_admin(&agent, "delete categories").is_err());
        assert!(require_staff(&agent, "assign tickets").is_ok());
        let err = require_staff(&end_user, "assign tickets").expect_err("denied");
        assert_eq!(err.code, "permission_denied");
        assert!(err.message.contains("assign tickets"));
    }
}
