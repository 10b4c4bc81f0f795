mod cmd;
mod output;
mod root;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, content::ContentSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "daybook",
    about = "Cohort-relative curriculum scheduling: what is due today, and what is done",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .daybook/)
    #[arg(long, global = true, env = "DAYBOOK_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log at debug level (RUST_LOG still applies)
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .daybook/ and a default config
    Init,

    /// Show a user's day: actions, content, and completion status
    Today {
        /// User id or email
        #[arg(long)]
        user: String,
        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Show which program day a user is on
    Day {
        #[arg(long)]
        user: String,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Record a progress status for an action
    Complete {
        #[arg(long)]
        user: String,
        /// Action id as shown by `daybook today`
        action: String,
        /// not_started, in_progress, completed, or skipped
        #[arg(long, default_value = "completed")]
        status: String,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Mark a program day completed in the per-day progress map
    CompleteDay {
        #[arg(long)]
        user: String,
        /// Day document id (default: the user's current day)
        #[arg(long)]
        day: Option<String>,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Tick (or with --undo, untick) an item on a day's checklist
    DayItem {
        #[arg(long)]
        user: String,
        /// Item id as shown by `daybook today`
        item: String,
        /// Day document id (default: the user's current day)
        #[arg(long)]
        day: Option<String>,
        #[arg(long)]
        undo: bool,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Show canonical status for action ids, with store conflicts
    Progress {
        #[arg(long)]
        user: String,
        #[arg(required = true)]
        actions: Vec<String>,
    },

    /// List past days not yet completed and content unlocked so far
    CatchUp {
        #[arg(long)]
        user: String,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Look up content items
    Content {
        #[command(subcommand)]
        subcommand: ContentSubcommand,
    },

    /// Audit plan, content, and progress data for consistency problems
    Check,

    /// Show or validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Today { user, at } => cmd::today::run(&root, &user, at, cli.json),
        Commands::Day { user, at } => cmd::day::run(&root, &user, at, cli.json),
        Commands::Complete {
            user,
            action,
            status,
            at,
        } => cmd::complete::run(&root, &user, &action, &status, at, cli.json),
        Commands::CompleteDay { user, day, at } => {
            cmd::complete_day::run_day(&root, &user, day, at, cli.json)
        }
        Commands::DayItem {
            user,
            item,
            day,
            undo,
            at,
        } => cmd::complete_day::run_item(&root, &user, &item, day, undo, at, cli.json),
        Commands::Progress { user, actions } => {
            cmd::progress::run(&root, &user, &actions, cli.json)
        }
        Commands::CatchUp { user, at } => cmd::catch_up::run(&root, &user, at, cli.json),
        Commands::Content { subcommand } => cmd::content::run(&root, subcommand, cli.json),
        Commands::Check => cmd::check::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
