//! `qd login`, `qd register`, `qd logout`, `qd whoami`.

use std::io::Write;
use std::path::Path;

use clap::Args;
use quickdesk_core::error::ErrorCode;
use quickdesk_core::model::{NewUser, Role, User};
use quickdesk_core::timing;

use crate::cmd::{Workspace, check_input, desk_fail, fail};
use crate::output::{CliError, OutputMode, pretty_kv, render, render_success};
use crate::validate;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Email address of an existing user.
    pub email: String,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,

    /// Display name.
    #[arg(long)]
    pub name: String,

    /// end_user, support_agent or admin.
    #[arg(long, default_value = "end_user")]
    pub role: Role,
}

fn render_user(output: OutputMode, user: &User, headline: &str) -> anyhow::Result<()> {
    render(output, user, |u, w| {
        writeln!(w, "{headline}")?;
        pretty_kv(w, "id", &u.id)?;
        pretty_kv(w, "name", &u.name)?;
        pretty_kv(w, "email", &u.email)?;
        pretty_kv(w, "role", u.role.as_str())
    })
}

pub fn run_login(args: &LoginArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut ws = Workspace::open(project_root, output)?;
    let mut auth = ws.authenticator();

    let ok = timing::timed("auth.login", || auth.login(&mut ws.desk, &args.email))
        .map_err(|e| desk_fail(output, &e))?;
    if !ok {
        return Err(fail(
            output,
            &CliError::with_details(
                format!("no user is registered with email '{}'", args.email.trim()),
                "Check the address, or create an account with `qd register`",
                ErrorCode::UserNotFound.code(),
            ),
        ));
    }

    let user = ws
        .desk
        .user_by_email(&args.email)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("user vanished after login"))?;
    render_user(output, &user, &format!("✓ Logged in as {}", user.name))
}

pub fn run_register(
    args: &RegisterArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    check_input(output, validate::validate_email(&args.email))?;
    check_input(output, validate::validate_name(&args.name))?;

    let mut ws = Workspace::open(project_root, output)?;
    let mut auth = ws.authenticator();
    let data = NewUser::new(args.email.trim(), args.name.trim(), args.role);

    let user = timing::timed("auth.register", || auth.register(&mut ws.desk, data))
        .map_err(|e| desk_fail(output, &e))?;
    render_user(output, &user, &format!("✓ Registered and logged in as {}", user.name))
}

pub fn run_logout(output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut ws = Workspace::open(project_root, output)?;
    let mut auth = ws.authenticator();
    auth.logout(&mut ws.desk).map_err(|e| desk_fail(output, &e))?;
    render_success(output, "Logged out")
}

pub fn run_whoami(
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ws = Workspace::open(project_root, output)?;
    let user = ws.actor(as_flag, output)?;
    render(output, &user, |u, w| {
        writeln!(w, "{} <{}>", u.name, u.email)?;
        pretty_kv(w, "id", &u.id)?;
        pretty_kv(w, "role", u.role.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: RegisterArgs,
    }

    #[test]
    fn register_defaults_to_end_user() {
        let w = Wrapper::parse_from(["test", "--email", "a@b.co", "--name", "A"]);
        assert_eq!(w.args.role, Role::EndUser);
    }

    #[test]
    fn register_parses_role_aliases() {
        let w = Wrapper::parse_from([
            "test", "--email", "a@b.co", "--name", "A", "--role", "agent",
        ]);
        assert_eq!(w.args.role, Role::SupportAgent);
    }
}
