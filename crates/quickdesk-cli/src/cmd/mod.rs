pub mod auth;
pub mod category;
pub mod comment;
pub mod completions;
pub mod create;
pub mod init;
pub mod list;
pub mod show;
pub mod stats;
pub mod update;
pub mod user;
pub mod vote;

use std::path::{Path, PathBuf};

use quickdesk_core::auth::Authenticator;
use quickdesk_core::config::{DESK_DIR, ProjectConfig, load_project_config};
use quickdesk_core::error::{DeskError, ErrorCode};
use quickdesk_core::model::User;
use quickdesk_core::store::FileStore;
use quickdesk_core::{Desk, timing};

use crate::actor::{self, ActorError};
use crate::output::{CliError, OutputMode, render_error};
use crate::validate::ValidationError;

/// Walk up from `start` to the nearest directory containing `.quickdesk/`.
pub fn find_desk_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(DESK_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Print `err` in the active output mode and turn it into the command's
/// failure.
pub fn fail(output: OutputMode, err: &CliError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, err) {
        tracing::debug!(%render_err, "failed to render error");
    }
    anyhow::anyhow!("{}", err.message)
}

pub fn desk_fail(output: OutputMode, err: &DeskError) -> anyhow::Error {
    fail(output, &CliError::from(err))
}

pub fn check_input(output: OutputMode, result: Result<(), ValidationError>) -> anyhow::Result<()> {
    result.map_err(|e| fail(output, &e.to_cli_error()))
}

pub fn check_actor<T>(output: OutputMode, result: Result<T, ActorError>) -> anyhow::Result<T> {
    result.map_err(|e| fail(output, &e.to_cli_error()))
}

/// An opened `.quickdesk/` project.
pub struct Workspace {
    pub desk: Desk<FileStore>,
    pub config: ProjectConfig,
    pub dir: PathBuf,
}

impl Workspace {
    pub fn open(project_root: &Path, output: OutputMode) -> anyhow::Result<Self> {
        let dir = find_desk_dir(project_root).ok_or_else(|| {
            let code = ErrorCode::NotInitialized;
            fail(
                output,
                &CliError::with_details(
                    "Not a quickdesk project: .quickdesk directory not found",
                    code.hint().unwrap_or_else(|| code.message()),
                    code.code(),
                ),
            )
        })?;
        let root = dir.parent().unwrap_or(project_root);

        let config = load_project_config(root).map_err(|e| {
            let code = ErrorCode::ConfigParseError;
            fail(
                output,
                &CliError::with_details(
                    format!("{e:#}"),
                    code.hint().unwrap_or_else(|| code.message()),
                    code.code(),
                ),
            )
        })?;

        let store = FileStore::open(&dir).map_err(|e| desk_fail(output, &DeskError::Store(e)))?;
        let desk = timing::timed("desk.open", || Desk::open(store))
            .map_err(|e| desk_fail(output, &e))?;
        tracing::debug!(dir = %dir.display(), ?desk, "opened desk");

        Ok(Self { desk, config, dir })
    }

    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(self.config.auth_latency())
    }

    /// The acting user, required.
    pub fn actor(&self, as_flag: Option<&str>, output: OutputMode) -> anyhow::Result<User> {
        check_actor(output, actor::require_actor(&self.desk, as_flag))
    }

    pub fn optional_actor(
        &self,
        as_flag: Option<&str>,
        output: OutputMode,
    ) -> anyhow::Result<Option<User>> {
        check_actor(output, actor::resolve_actor(&self.desk, as_flag))
    }
}
