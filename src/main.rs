//! olcli - Overleaf command-line client
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use olcli::cli::{commands, Cli, Commands};
use olcli::config::{Config, ConfigManager};
use olcli::error::OlResult;
use olcli::ui;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> OlResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load()?;

    init_logging(cli.verbose, &config);
    ui::init_theme();

    match cli.command {
        Commands::Login(args) => commands::login(args, &config),
        Commands::Logout => commands::logout(&config),
        Commands::Projects(args) => commands::projects(args, &config),
        Commands::Docs(args) => commands::docs(args, &config),
        Commands::Compile(args) => commands::compile(args, &config),
        Commands::Download(args) => commands::download(args, &config),
        Commands::Config(args) => commands::config(args, &config, &config_manager),
        Commands::Cache(args) => commands::cache(args, &config),
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("olcli=warn"),
        1 => EnvFilter::new("olcli=info"),
        _ => EnvFilter::new("olcli=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}
