//! `qd user` — user administration.

use std::io::Write;
use std::path::Path;

use clap::{Args, Subcommand};
use quickdesk_core::Desk;
use quickdesk_core::error::{DeskError, EntityKind};
use quickdesk_core::model::{Role, User, UserPatch};
use quickdesk_core::store::BlobStore;
use quickdesk_core::view::RoleCounts;
use serde::Serialize;

use crate::actor;
use crate::cmd::{Workspace, check_actor, check_input, desk_fail, fail};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render, render_mode, truncate};
use crate::validate;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    #[command(about = "List users (staff)")]
    List(UserListArgs),

    #[command(
        about = "Edit a user",
        long_about = "Edit a user. Admins may edit anyone, including roles; everyone else may edit only their own name, email and avatar.",
        after_help = "EXAMPLES:\n    # Promote a user\n    qd --as admin@quickdesk.com user update user@quickdesk.com --role support_agent"
    )]
    Update(UserUpdateArgs),

    #[command(about = "Delete a user (admin)")]
    Delete(UserDeleteArgs),
}

#[derive(Args, Debug)]
pub struct UserListArgs {
    /// Only users with this role.
    #[arg(long)]
    pub role: Option<Role>,
}

#[derive(Args, Debug)]
pub struct UserUpdateArgs {
    /// User id or email.
    pub user: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub role: Option<Role>,

    /// Avatar image URL.
    #[arg(long, conflicts_with = "clear_avatar")]
    pub avatar: Option<String>,

    #[arg(long)]
    pub clear_avatar: bool,
}

#[derive(Args, Debug)]
pub struct UserDeleteArgs {
    /// User id or email.
    pub user: String,
}

#[derive(Debug, Serialize)]
struct UserListOutput<'a> {
    roles: RoleCounts,
    users: Vec<&'a User>,
}

/// Resolve a user id or email, reporting an unknown one as not found.
pub fn resolve_user<S: BlobStore>(
    desk: &Desk<S>,
    reference: &str,
    output: OutputMode,
) -> anyhow::Result<User> {
    let reference = reference.trim();
    desk.user(reference)
        .or_else(|| desk.user_by_email(reference))
        .cloned()
        .ok_or_else(|| {
            desk_fail(
                output,
                &DeskError::NotFound {
                    kind: EntityKind::User,
                    id: reference.to_string(),
                },
            )
        })
}

pub fn run_user(
    args: &UserArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        UserCommand::List(list) => run_list(list, as_flag, output, project_root),
        UserCommand::Update(update) => run_update(update, as_flag, output, project_root),
        UserCommand::Delete(delete) => run_delete(delete, as_flag, output, project_root),
    }
}

fn run_list(
    args: &UserListArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ws = Workspace::open(project_root, output)?;
    let me = ws.actor(as_flag, output)?;
    check_actor(output, actor::require_staff(&me, "list users"))?;

    let users: Vec<&User> = ws
        .desk
        .users()
        .iter()
        .filter(|u| args.role.is_none_or(|role| u.role == role))
        .collect();
    let report = UserListOutput {
        roles: RoleCounts::tally(users.iter().copied()),
        users,
    };

    render_mode(
        output,
        &report,
        |r, w| {
            for u in &r.users {
                writeln!(w, "{}\t{}\t{}\t{}", u.id, u.role, u.email, u.name)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(
                w,
                &format!(
                    "Users ({}: {} admin, {} agent, {} end user)",
                    r.users.len(),
                    r.roles.admin,
                    r.roles.support_agent,
                    r.roles.end_user
                ),
            )?;
            for u in &r.users {
                writeln!(
                    w,
                    "{:<14} {:<14} {:<28} {}",
                    u.id,
                    u.role.as_str(),
                    truncate(&u.email, 28),
                    u.name
                )?;
            }
            Ok(())
        },
    )
}

fn render_user(output: OutputMode, user: &User, headline: &str) -> anyhow::Result<()> {
    render(output, user, |u, w| {
        writeln!(w, "{headline}")?;
        pretty_kv(w, "id", &u.id)?;
        pretty_kv(w, "name", &u.name)?;
        pretty_kv(w, "email", &u.email)?;
        pretty_kv(w, "role", u.role.as_str())?;
        if let Some(avatar) = u.avatar.as_deref() {
            pretty_kv(w, "avatar", avatar)?;
        }
        Ok(())
    })
}

fn run_update(
    args: &UserUpdateArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    if let Some(name) = args.name.as_deref() {
        check_input(output, validate::validate_name(name))?;
    }
    if let Some(email) = args.email.as_deref() {
        check_input(output, validate::validate_email(email))?;
    }

    let mut ws = Workspace::open(project_root, output)?;
    let me = ws.actor(as_flag, output)?;
    let target = resolve_user(&ws.desk, &args.user, output)?;
    if target.id != me.id || args.role.is_some() {
        check_actor(output, actor::require_admin(&me, "edit other users or roles"))?;
    }

    let patch = UserPatch {
        email: args.email.as_deref().map(|s| s.trim().to_string()),
        name: args.name.as_deref().map(|s| s.trim().to_string()),
        role: args.role,
        avatar: if args.clear_avatar {
            Some(None)
        } else {
            args.avatar.clone().map(Some)
        },
    };
    if patch == UserPatch::default() {
        return Err(fail(
            output,
            &CliError::with_details(
                "nothing to update",
                "Pass at least one of --name, --email, --role, --avatar, --clear-avatar",
                "empty_update",
            ),
        ));
    }

    let user = ws
        .desk
        .update_user(&target.id, patch)
        .map_err(|e| desk_fail(output, &e))?;
    render_user(output, &user, &format!("✓ Updated {}", user.email))
}

fn run_delete(
    args: &UserDeleteArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut ws = Workspace::open(project_root, output)?;
    let me = ws.actor(as_flag, output)?;
    check_actor(output, actor::require_admin(&me, "delete users"))?;
    let target = resolve_user(&ws.desk, &args.user, output)?;
    if target.id == me.id {
        return Err(fail(
            output,
            &CliError::with_details(
                "refusing to delete the acting admin",
                "Act as a different admin to remove this account",
                "self_delete",
            ),
        ));
    }

    let removed = ws
        .desk
        .delete_user(&target.id)
        .map_err(|e| desk_fail(output, &e))?;
    render_user(output, &removed, &format!("✓ Deleted {}", removed.email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use quickdesk_core::store::MemoryStore;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: UserUpdateArgs,
    }

    #[test]
    fn resolves_by_id_and_email() {
        let desk = Desk::open(MemoryStore::new()).expect("open");
        let by_id = resolve_user(&desk, "2", OutputMode::Json).expect("by id");
        let by_email =
            resolve_user(&desk, " Agent@QuickDesk.com ", OutputMode::Json).expect("by email");
        assert_eq!(by_id.id, by_email.id);
    }

    #[test]
    fn avatar_flags_conflict() {
        assert!(
            Wrapper::try_parse_from(["test", "3", "--avatar", "https://x/a.png", "--clear-avatar"])
                .is_err()
        );
        let w = Wrapper::parse_from(["test", "3", "--role", "agent"]);
        assert_eq!(w.args.role, Some(Role::SupportAgent));
    }
}
