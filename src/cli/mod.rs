//! CLI parser and command dispatch.

mod config_cmd;
mod extract;
mod fetch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::models::Method;

pub use fetch::OutputFormat;

#[derive(Parser)]
#[command(name = "clearread")]
#[command(about = "Retrieve readable articles through paywalls, bot walls and client-side rendering")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve an article, escalating through the configured strategies
    Fetch {
        /// Article URL
        url: String,
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Only run these methods, in configured order (e.g. --only live,archive)
        #[arg(long, value_enum, value_delimiter = ',')]
        only: Vec<Method>,
    },

    /// Run extraction and the quality gate on a saved page
    Extract {
        /// Saved HTML file
        file: PathBuf,
        /// URL the page was fetched from, for resolving relative links
        #[arg(short, long)]
        base_url: String,
        /// Judge the result with this method's thresholds
        #[arg(short, long, value_enum, default_value = "live")]
        method: Method,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from_path(path)
                .await
                .map_err(|e| anyhow::anyhow!(e))?
        }
        None => Config::load().await,
    };

    match cli.command {
        Commands::Fetch { url, format, only } => {
            fetch::cmd_fetch(&config, &url, format, &only).await
        }
        Commands::Extract {
            file,
            base_url,
            method,
        } => extract::cmd_extract(&config, &file, &base_url, method).await,
        Commands::Config => config_cmd::cmd_config(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fetch_accepts_comma_separated_methods() {
        let cli = Cli::parse_from([
            "clearread",
            "fetch",
            "https://example.com/a",
            "--only",
            "live,archive",
            "-f",
            "html",
        ]);
        match cli.command {
            Commands::Fetch { url, format, only } => {
                assert_eq!(url, "https://example.com/a");
                assert_eq!(format, OutputFormat::Html);
                assert_eq!(only, vec![Method::Live, Method::Archive]);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["clearread", "config", "-v", "-c", "clearread.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("clearread.toml")));
    }
}
