//! Email-only sign-in backed by the desk's user collection.
//!
//! There are no passwords. A session is the signed-in user's record stored
//! under [`SESSION_KEY`]; it survives across processes until logout.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::desk::Desk;
use crate::error::DeskError;
use crate::model::{NewUser, User};
use crate::store::{BlobStore, SESSION_KEY};

/// Simulated round-trip applied to every auth call.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    /// A call has started and resolves once `deadline` passes.
    Pending { deadline: Instant },
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    latency: Duration,
    state: AuthState,
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

impl Authenticator {
    #[must_use]
    pub const fn new(latency: Duration) -> Self {
        Self {
            latency,
            state: AuthState::Idle,
        }
    }

    #[must_use]
    pub const fn latency(&self) -> Duration {
        self.latency
    }

    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, AuthState::Pending { .. })
    }

    fn begin(&mut self) {
        self.state = AuthState::Pending {
            deadline: Instant::now() + self.latency,
        };
    }

    /// Wait out the pending deadline, run `op`, and return to idle whatever
    /// `op` returns.
    fn resolve<R>(&mut self, op: impl FnOnce() -> R) -> R {
        if let AuthState::Pending { deadline } = self.state {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
        let out = op();
        self.state = AuthState::Idle;
        out
    }

    /// Sign in as the user registered under `email`.
    ///
    /// Returns `Ok(false)` when no such user exists; the session is left
    /// untouched in that case.
    pub fn login<S: BlobStore>(
        &mut self,
        desk: &mut Desk<S>,
        email: &str,
    ) -> Result<bool, DeskError> {
        self.begin();
        self.resolve(|| {
            let Some(user) = desk.user_by_email(email).cloned() else {
                debug!(email, "login rejected: unknown email");
                return Ok(false);
            };
            write_session(desk, &user)?;
            info!(user = %user.id, role = %user.role, "logged in");
            Ok(true)
        })
    }

    /// Add a new user to the desk and sign in as them.
    pub fn register<S: BlobStore>(
        &mut self,
        desk: &mut Desk<S>,
        data: NewUser,
    ) -> Result<User, DeskError> {
        self.begin();
        self.resolve(|| {
            let user = desk.register_user(data)?;
            write_session(desk, &user)?;
            Ok(user)
        })
    }

    /// End the current session. Logging out with no session is fine.
    pub fn logout<S: BlobStore>(&mut self, desk: &mut Desk<S>) -> Result<(), DeskError> {
        desk.store_mut().remove(SESSION_KEY)?;
        info!("logged out");
        Ok(())
    }
}

fn write_session<S: BlobStore>(desk: &mut Desk<S>, user: &User) -> Result<(), DeskError> {
    let blob = serde_json::to_string(user).map_err(|source| DeskError::Encode {
        key: SESSION_KEY.to_string(),
        source,
    })?;
    desk.store_mut().save(SESSION_KEY, &blob)?;
    Ok(())
}

/// The user recorded by the last successful login or register, if any.
///
/// This is the snapshot taken at sign-in; later edits to the user record are
/// not reflected until the next login.
pub fn current_user<S: BlobStore>(desk: &Desk<S>) -> Result<Option<User>, DeskError> {
    let Some(blob) = desk.store().load(SESSION_KEY)? else {
        return Ok(None);
    };
    serde_json::from_str(&blob)
        .map(Some)
        .map_err(|source| DeskError::CorruptBlob {
            key: SESSION_KEY.to_string(),
            source,
        })
}
