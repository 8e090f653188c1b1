//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// olcli - Overleaf from the command line
///
/// Log in, list projects and documents, compile on the server and
/// download the results.
#[derive(Parser, Debug)]
#[command(name = "olcli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "OLCLI_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login(LoginArgs),

    /// Forget the stored session
    Logout,

    /// List projects
    Projects(ProjectsArgs),

    /// List the documents of a project
    Docs(DocsArgs),

    /// Compile a project and download the result
    Compile(CompileArgs),

    /// Download a compile output, a URL or the project archive
    Download(DownloadArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Inspect or clear cached compile results
    Cache(CacheArgs),
}

/// Arguments for the login command
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Account email (prompted for when missing)
    #[arg(short, long, env = "OLCLI_EMAIL")]
    pub email: Option<String>,
}

/// Arguments for the projects command
#[derive(Parser, Debug)]
pub struct ProjectsArgs {
    /// Include trashed and archived projects
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the docs command
#[derive(Parser, Debug)]
pub struct DocsArgs {
    /// Project id or project URL
    pub project: String,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the compile command
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Project id or project URL
    pub project: String,

    /// Document id to compile (defaults to the project's main document)
    #[arg(short, long)]
    pub doc: Option<String>,

    /// Compile even when a fresh cached result exists
    #[arg(short, long)]
    pub force: bool,

    /// Output type to download after compiling
    #[arg(short, long, default_value = "pdf")]
    pub target: String,

    /// Destination file or directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only compile, skip the download
    #[arg(long, conflicts_with = "output")]
    pub no_download: bool,
}

/// Arguments for the download command
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Output type (pdf, log, bbl, ...), `zip` for the project archive, or a URL
    pub target: String,

    /// Project id or project URL
    #[arg(short, long)]
    pub project: Option<String>,

    /// Document id the project was compiled with
    #[arg(short, long)]
    pub doc: Option<String>,

    /// Destination file or directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.ttl_secs)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached compile results
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove all cached compile results
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
