//! Folio CLI
//!
//! Command-line interface and stdio host for the Folio page store.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use folio_core::{Client, Config};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

/// Environment variable holding the log filter (logging is off when unset)
const LOG_ENV: &str = "FOLIO_LOG";

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio - local pages with full-text search and backlinks")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON request envelopes over stdin/stdout
    Serve,
    /// List all pages
    #[command(alias = "ls")]
    List,
    /// Show a page
    Show {
        /// Page path (a bare name is placed under /pages/)
        path: String,
    },
    /// Create or update a page
    Save {
        /// Page path (a bare name is placed under /pages/)
        path: String,
        /// Page title (defaults to the last path segment)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Page body (opens editor if not provided)
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Delete a page
    #[command(alias = "rm")]
    Delete {
        /// Page path (a bare name is placed under /pages/)
        path: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Full-text search
    Search {
        /// FTS5 match expression
        query: String,
    },
    /// Pages linking to a page
    Backlinks {
        /// Page path (a bare name is placed under /pages/)
        path: String,
    },
    /// Run a read-only SQL query
    Query {
        /// A single SELECT or WITH statement
        sql: String,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    init_logging(&config);

    match cli.command {
        Commands::Config { command } => match command {
            Some(ConfigCommands::Show) | None => {
                commands::config::show(&config, cli.config.as_ref(), &output)
            }
        },
        Commands::Serve => commands::serve::run(&config).await,
        command => {
            let client = Client::spawn(&config);
            handle_page_command(command, &client, &config, &output).await
        }
    }
}

async fn handle_page_command(
    command: Commands,
    client: &Client,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        Commands::List => commands::page::list(client, output).await,
        Commands::Show { path } => commands::page::show(client, &path, output).await,
        Commands::Save { path, title, body } => {
            commands::page::save(client, &path, title, body, output).await
        }
        Commands::Delete { path, yes } => commands::page::delete(client, &path, yes, output).await,
        Commands::Search { query } => commands::page::search(client, &query, output).await,
        Commands::Backlinks { path } => commands::page::backlinks(client, &path, output).await,
        Commands::Query { sql } => commands::page::query(client, &sql, output).await,
        Commands::Status => commands::status::show(client, config, output).await,
        Commands::Serve | Commands::Config { .. } => unreachable!(), // Handled in main
    }
}

/// Install the tracing subscriber when FOLIO_LOG is set
///
/// Logs go to `log_file` when configured, otherwise stderr. Stdout carries
/// command output and, under `serve`, response envelopes only.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let env_filter = EnvFilter::new(format!("folio_core={0},folio_cli={0}", log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore the error if a subscriber is already installed
    match &config.log_file {
        Some(log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };
            let _ = builder.with_ansi(false).with_writer(log_file).try_init();
            info!("Logging to {:?}", log_path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_save_with_flags() {
        let cli = Cli::try_parse_from([
            "folio", "--json", "save", "Rust", "--title", "Rust", "--body", "See [[Cargo]]",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Save { path, title, body } => {
                assert_eq!(path, "Rust");
                assert_eq!(title.as_deref(), Some("Rust"));
                assert_eq!(body.as_deref(), Some("See [[Cargo]]"));
            }
            _ => panic!("Expected save command"),
        }
    }
}
