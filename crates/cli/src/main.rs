mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "odx", version, about = "Index and query org-mode outlines")]
struct Cli {
    /// Config file path (defaults to the XDG location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Profile name from the config file
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate configuration and index health, print resolved paths
    Doctor,

    /// Index the workspace into SQLite
    Index(IndexArgs),

    /// Query indexed headings by expression or structured flags
    Query(QueryArgs),

    /// Watch the workspace and keep the index current
    Watch,

    /// Show workflow-state counts, tag frequencies and the agenda
    Stats(StatsArgs),

    /// Drop all indexed data and reinitialize the schema
    Reset(ResetArgs),
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Reindex every file even when its content hash is unchanged
    #[arg(long)]
    pub force: bool,

    /// Print each file as it is processed
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Query expression, e.g. '(and (todo "NEXT") (tag "work"))'
    pub expr: Option<String>,

    /// Match one of the given workflow states (repeatable)
    #[arg(long)]
    pub todo: Vec<String>,

    /// Match a priority (bare letter or [#A] form)
    #[arg(long)]
    pub priority: Option<String>,

    /// Match headings carrying any of the given tags (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,

    /// Match an exact outline level
    #[arg(long)]
    pub level: Option<u32>,

    /// Restrict to one file URI
    #[arg(long)]
    pub file: Option<String>,

    /// Substring match over titles
    #[arg(long)]
    pub text: Option<String>,

    /// Sort key: file, priority, scheduled, deadline or level
    #[arg(long)]
    pub sort: Option<String>,

    /// Maximum number of rows
    #[arg(long)]
    pub limit: Option<u32>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Shorthand for --output json
    #[arg(long)]
    pub json: bool,

    /// Print file:line locations only
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Emit JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Confirm the destructive reset
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Quiet,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Doctor => {
            cmd::doctor::run(cli.config.as_deref(), cli.profile.as_deref());
        }
        Commands::Index(args) => {
            cmd::index::run(cli.config.as_deref(), cli.profile.as_deref(), &args);
        }
        Commands::Query(args) => {
            cmd::query::run(cli.config.as_deref(), cli.profile.as_deref(), args);
        }
        Commands::Watch => {
            cmd::watch::run(cli.config.as_deref(), cli.profile.as_deref());
        }
        Commands::Stats(args) => {
            cmd::stats::run(cli.config.as_deref(), cli.profile.as_deref(), &args);
        }
        Commands::Reset(args) => {
            cmd::reset::run(cli.config.as_deref(), cli.profile.as_deref(), &args);
        }
    }
}
