#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;
mod validate;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use quickdesk_core::config::load_user_config;
use quickdesk_core::timing;
use std::env;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "qd: a local helpdesk for tickets, votes and comments",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit command timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Shorthand for `--format json`.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (pretty, text, json).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Act as this user (id or email) instead of the logged-in one.
    #[arg(long = "as", global = true, value_name = "USER")]
    as_user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        let user_output = load_user_config().ok().and_then(|cfg| cfg.output);
        output::resolve_output_mode(self.format, self.json, user_output.as_deref())
    }

    fn as_flag(&self) -> Option<&str> {
        self.as_user.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a quickdesk project",
        long_about = "Create .quickdesk/ in the current directory and seed it with demo users, categories and tickets.",
        after_help = "EXAMPLES:\n    qd init\n\n    # Rewrite config.toml, keep data\n    qd init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Session",
        about = "Log in by email",
        after_help = "EXAMPLES:\n    qd login agent@quickdesk.com"
    )]
    Login(cmd::auth::LoginArgs),

    #[command(
        next_help_heading = "Session",
        about = "Create an account and log in",
        after_help = "EXAMPLES:\n    qd register --email sam@example.com --name \"Sam Lee\""
    )]
    Register(cmd::auth::RegisterArgs),

    #[command(next_help_heading = "Session", about = "End the stored session")]
    Logout,

    #[command(next_help_heading = "Session", about = "Show the acting user")]
    Whoami,

    #[command(
        next_help_heading = "Tickets",
        about = "Open a ticket",
        after_help = "EXAMPLES:\n    qd create -s \"VPN drops hourly\" -d \"Since Monday\" -c \"Technical Issue\" -p high\n\n    qd create -s \"Add dark mode\" -d \"Please\" -c 4 --json"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "List tickets",
        long_about = "List tickets with optional filters and sort order. End users see only their own tickets.",
        after_help = "EXAMPLES:\n    qd list --status open --sort priority\n\n    qd list --assigned-to-me\n\n    qd list --search crash --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Show one ticket with its comments",
        after_help = "EXAMPLES:\n    qd show 2\n\n    qd show 2 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Edit a ticket",
        after_help = "EXAMPLES:\n    qd update 2 --priority urgent\n\n    qd --as agent@quickdesk.com update 2 --status resolved"
    )]
    Update(cmd::update::UpdateArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Assign a ticket (staff)",
        after_help = "EXAMPLES:\n    # Take it yourself\n    qd assign 1\n\n    qd assign 1 --to agent@quickdesk.com\n\n    qd assign 1 --unassign"
    )]
    Assign(cmd::update::AssignArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Vote a ticket up or down",
        after_help = "EXAMPLES:\n    qd vote 2 up\n\n    qd vote 2 down"
    )]
    Vote(cmd::vote::VoteArgs),

    #[command(next_help_heading = "Comments", about = "Add comments")]
    Comment(cmd::comment::CommentArgs),

    #[command(
        next_help_heading = "Comments",
        about = "Show a ticket's comment thread",
        after_help = "EXAMPLES:\n    qd comments 2"
    )]
    Comments(cmd::comment::CommentsArgs),

    #[command(next_help_heading = "Admin", about = "List and manage categories")]
    Category(cmd::category::CategoryArgs),

    #[command(next_help_heading = "Admin", about = "List and manage users")]
    User(cmd::user::UserArgs),

    #[command(
        next_help_heading = "Admin",
        about = "Dashboard numbers for your role",
        after_help = "EXAMPLES:\n    qd --as admin@quickdesk.com stats"
    )]
    Stats,

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    qd completions bash > ~/.local/share/bash-completion/completions/qd"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("QUICKDESK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "quickdesk=debug,info"
        } else {
            "quickdesk=info,warn"
        })
    });

    let format = env::var("QUICKDESK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let timing_enabled = cli.timing || timing::enabled_from_env();
    timing::set_enabled(timing_enabled);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let output = cli.output_mode();
    let as_flag = cli.as_flag();
    debug!(?output, as_user = ?as_flag, "resolved invocation");

    let command_result = match &cli.command {
        Commands::Init(args) => {
            timing::timed("cmd.init", || cmd::init::run_init(args, output, &project_root))
        }
        Commands::Login(args) => {
            timing::timed("cmd.login", || cmd::auth::run_login(args, output, &project_root))
        }
        Commands::Register(args) => timing::timed("cmd.register", || {
            cmd::auth::run_register(args, output, &project_root)
        }),
        Commands::Logout => {
            timing::timed("cmd.logout", || cmd::auth::run_logout(output, &project_root))
        }
        Commands::Whoami => timing::timed("cmd.whoami", || {
            cmd::auth::run_whoami(as_flag, output, &project_root)
        }),
        Commands::Create(args) => timing::timed("cmd.create", || {
            cmd::create::run_create(args, as_flag, output, &project_root)
        }),
        Commands::List(args) => timing::timed("cmd.list", || {
            cmd::list::run_list(args, as_flag, output, &project_root)
        }),
        Commands::Show(args) => timing::timed("cmd.show", || {
            cmd::show::run_show(args, as_flag, output, &project_root)
        }),
        Commands::Update(args) => timing::timed("cmd.update", || {
            cmd::update::run_update(args, as_flag, output, &project_root)
        }),
        Commands::Assign(args) => timing::timed("cmd.assign", || {
            cmd::update::run_assign(args, as_flag, output, &project_root)
        }),
        Commands::Vote(args) => timing::timed("cmd.vote", || {
            cmd::vote::run_vote(args, as_flag, output, &project_root)
        }),
        Commands::Comment(args) => timing::timed("cmd.comment", || {
            cmd::comment::run_comment(args, as_flag, output, &project_root)
        }),
        Commands::Comments(args) => timing::timed("cmd.comments", || {
            cmd::comment::run_comments(args, as_flag, output, &project_root)
        }),
        Commands::Category(args) => timing::timed("cmd.category", || {
            cmd::category::run_category(args, as_flag, output, &project_root)
        }),
        Commands::User(args) => timing::timed("cmd.user", || {
            cmd::user::run_user(args, as_flag, output, &project_root)
        }),
        Commands::Stats => timing::timed("cmd.stats", || {
            cmd::stats::run_stats(as_flag, output, &project_root)
        }),
        Commands::Completions(args) => timing::timed("cmd.completions", || {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }),
    };

    if timing_enabled {
        let report = timing::collect_report();
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
            eprintln!("timing report (json):");
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    command_result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["qd", "--timing", "stats"]);
        assert!(cli.timing);
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn timing_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["qd", "list", "--timing"]);
        assert!(cli.timing);
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["qd", "--json", "list"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_after_subcommand() {
        let cli = Cli::parse_from(["qd", "show", "2", "--format", "text"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
        assert_eq!(cli.output_mode(), OutputMode::Text);
    }

    #[test]
    fn as_flag_is_global() {
        let cli = Cli::parse_from(["qd", "vote", "2", "up", "--as", "agent@quickdesk.com"]);
        assert_eq!(cli.as_flag(), Some("agent@quickdesk.com"));
        let cli = Cli::parse_from(["qd", "whoami"]);
        assert_eq!(cli.as_flag(), None);
    }

    #[test]
    fn nested_subcommands_parse() {
        let cli = Cli::parse_from(["qd", "comment", "add", "2", "hello", "--internal"]);
        assert!(matches!(cli.command, Commands::Comment(_)));
        let cli = Cli::parse_from(["qd", "category", "delete", "4"]);
        assert!(matches!(cli.command, Commands::Category(_)));
        let cli = Cli::parse_from(["qd", "user", "list", "--role", "admin"]);
        assert!(matches!(cli.command, Commands::User(_)));
    }

    #[test]
    fn all_subcommands_listed() {
        let expected = [
            "init",
            "login",
            "register",
            "logout",
            "whoami",
            "create",
            "list",
            "show",
            "update",
            "assign",
            "vote",
            "comment",
            "comments",
            "category",
            "user",
            "stats",
            "completions",
        ];
        let command = Cli::command();
        let names: Vec<&str> = command.get_subcommands().map(clap::Command::get_name).collect();
        for name in expected {
            assert!(names.contains(&name), "missing subcommand {name}");
        }
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["qd", "frobnicate"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
