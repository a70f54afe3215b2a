//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod extract;
mod fetch;
mod repair;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "recipe")]
#[command(about = "Recipe acquisition: fetch pages past bot walls and normalize LLM recipe output")]
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
    /// Fetch readable text for a URL, escalating through the fetch tiers
    Fetch {
        url: String,
        /// Print the per-tier attempt trace as JSON on stderr
        #[arg(long)]
        trace: bool,
    },

    /// Classify text as real content or a block page
    Classify {
        /// Input file (stdin when omitted or "-")
        file: Option<PathBuf>,
    },

    /// Recover JSON from raw model output
    Repair {
        /// Input file (stdin when omitted or "-")
        file: Option<PathBuf>,
        /// Report the tier that produced valid JSON
        #[arg(long)]
        tier: bool,
    },

    /// Repair and normalize model output into a canonical recipe
    Normalize {
        /// Input file (stdin when omitted or "-")
        file: Option<PathBuf>,
        /// Source URL to record on the recipe
        #[arg(long)]
        source: Option<String>,
    },

    /// Run the full pipeline on a URL or on a text file
    Extract {
        /// Recipe page URL
        #[arg(required_unless_present = "text", conflicts_with = "text")]
        url: Option<String>,
        /// Extract from a text file instead ("-" for stdin)
        #[arg(long)]
        text: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration (API keys redacted)
    Show {
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

/// Parse arguments, load configuration, and run the chosen command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Fetch { url, trace } => fetch::cmd_fetch(&config, &url, trace).await,
        Commands::Classify { file } => fetch::cmd_classify(&config, file.as_deref()).await,
        Commands::Repair { file, tier } => repair::cmd_repair(file.as_deref(), tier).await,
        Commands::Normalize { file, source } => {
            repair::cmd_normalize(&config, file.as_deref(), source.as_deref()).await
        }
        Commands::Extract { url, text } => {
            extract::cmd_extract(&config, url.as_deref(), text.as_deref()).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show { format } => config_cmd::cmd_config_show(&config, format),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_needs_url_or_text() {
        assert!(Cli::try_parse_from(["recipe", "extract"]).is_err());
        assert!(Cli::try_parse_from(["recipe", "extract", "https://x.com/r"]).is_ok());
        assert!(Cli::try_parse_from(["recipe", "extract", "--text", "r.txt"]).is_ok());
        assert!(Cli::try_parse_from(["recipe", "extract", "https://x.com", "--text", "r.txt"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["recipe", "repair", "-", "--tier", "-v", "-c", "r.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("r.toml")));
        assert!(matches!(cli.command, Commands::Repair { tier: true, .. }));
    }
}
