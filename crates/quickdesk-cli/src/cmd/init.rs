use anyhow::{Context as _, Result};
use clap::Args;
use quickdesk_core::config::{DESK_DIR, default_project_config_toml, project_config_path};
use quickdesk_core::store::FileStore;
use quickdesk_core::{Desk, DeskError};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::cmd::desk_fail;
use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-initialize even if `.quickdesk/` already exists. Existing data is
    /// kept; only the config file is rewritten.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "# per-user login session and store internals\n\
    quickdesk_user.json\n\
    store.lock\n\
    .*.tmp\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    path: String,
    users: usize,
    categories: usize,
    tickets: usize,
    comments: usize,
}

/// Execute `qd init`. Creates the project skeleton:
///
/// ```text
/// .quickdesk/
///   config.toml               (default project config)
///   .gitignore                (session and lock files)
///   quickdesk_*.json          (collections, seeded with demo data)
/// ```
///
/// # Errors
///
/// Returns an error if `.quickdesk/` already exists and `--force` is not set,
/// or if any filesystem operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let desk_dir = project_root.join(DESK_DIR);

    if desk_dir.exists() && !args.force {
        anyhow::bail!("{DESK_DIR}/ already exists. Use `qd init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&desk_dir)
        .with_context(|| format!("Failed to create {}", desk_dir.display()))?;

    let config_path = project_config_path(project_root);
    std::fs::write(&config_path, default_project_config_toml())
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = desk_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let store = FileStore::open(&desk_dir).map_err(|e| desk_fail(output, &DeskError::Store(e)))?;
    let desk = Desk::open(store).map_err(|e| desk_fail(output, &e))?;

    let report = InitOutput {
        ok: true,
        path: desk_dir.display().to_string(),
        users: desk.users().len(),
        categories: desk.categories().len(),
        tickets: desk.tickets().len(),
        comments: desk.comments().len(),
    };

    render(output, &report, |r, w| {
        writeln!(w, "✓ Initialized {}", r.path)?;
        writeln!(w)?;
        pretty_kv(w, "users", r.users.to_string())?;
        pretty_kv(w, "categories", r.categories.to_string())?;
        pretty_kv(w, "tickets", r.tickets.to_string())?;
        pretty_kv(w, "comments", r.comments.to_string())?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  Sign in (demo accounts: admin@, agent@, user@quickdesk.com):")?;
        writeln!(w, "    qd login user@quickdesk.com")?;
        writeln!(w, "  Or act as someone without a session:")?;
        writeln!(w, "    export QUICKDESK_USER=agent@quickdesk.com")?;
        writeln!(w, "  Open your first ticket:")?;
        writeln!(
            w,
            "    qd create --subject \"VPN drops hourly\" --description \"...\" --category 1"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_skeleton_and_seeds() {
        let root = tempfile::tempdir().expect("tempdir");
        run_init(&InitArgs { force: false }, OutputMode::Json, root.path()).expect("init");

        let dir = root.path().join(DESK_DIR);
        assert!(dir.join("config.toml").is_file());
        assert!(dir.join(".gitignore").is_file());
        assert!(dir.join("quickdesk_tickets.json").is_file());
        assert!(dir.join("quickdesk_users.json").is_file());
    }

    #[test]
    fn second_init_requires_force_and_keeps_data() {
        let root = tempfile::tempdir().expect("tempdir");
        run_init(&InitArgs { force: false }, OutputMode::Json, root.path()).expect("init");
        let tickets = root.path().join(DESK_DIR).join("quickdesk_tickets.json");
        std::fs::write(&tickets, "[]").expect("empty tickets");

        assert!(run_init(&InitArgs { force: false }, OutputMode::Json, root.path()).is_err());
        run_init(&InitArgs { force: true }, OutputMode::Json, root.path()).expect("force");
        assert_eq!(std::fs::read_to_string(&tickets).expect("read"), "[]");
    }
}
