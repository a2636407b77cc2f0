//! CLI module for molecule-insight
//!
//! Provides command-line interface parsing for the molecule-insight binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG: &str = "molecule-insight.toml";

/// MoleculeInsight - concurrent, cached intelligence gathering for chemical compounds
#[derive(Parser, Debug)]
#[command(
    name = "molecule-insight",
    version,
    about = "MoleculeInsight - concurrent, cached intelligence gathering for chemical compounds",
    long_about = "Runs market, clinical, patent, trade, news and internal-knowledge workers\n\
                  for one molecule in parallel, caches their reports, and synthesizes\n\
                  innovation opportunities from the results.\n\n\
                  Run without arguments to start the HTTP server.",
    after_help = "EXAMPLES:\n    \
                  molecule-insight                                  # Start the server\n    \
                  molecule-insight analyze \"Patent landscape of Metformin\"\n    \
                  molecule-insight analyze \"export outlook\" --molecule Imatinib --json\n    \
                  molecule-insight cache prune                      # Remove expired entries"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG, global = true)]
    pub config: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Analyze one molecule and print the reports
    Analyze {
        /// Free-text query; the molecule is extracted from it unless --molecule is given
        query: String,

        /// Molecule to analyze, overriding extraction
        #[arg(short, long)]
        molecule: Option<String>,

        /// Geography of interest
        #[arg(short, long, default_value = "Global")]
        geography: String,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which molecule would be extracted from a query
    Resolve {
        /// Free-text query
        query: String,
    },

    /// Inspect or clean the worker cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// List the registered workers
    Workers,
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List cached entries
    Info,

    /// Remove expired entries
    Prune,

    /// Remove every entry
    Clear,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Take the command to run; no subcommand means `serve`
    pub fn take_command(&mut self) -> Commands {
        self.command.take().unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let mut cli = Cli::try_parse_from(["molecule-insight"]).unwrap();
        assert!(matches!(cli.take_command(), Commands::Serve));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG));
    }

    #[test]
    fn test_parse_analyze() {
        let mut cli = Cli::try_parse_from([
            "molecule-insight",
            "analyze",
            "export outlook",
            "--molecule",
            "Imatinib",
            "--json",
        ])
        .unwrap();

        match cli.take_command() {
            Commands::Analyze {
                query,
                molecule,
                geography,
                json,
            } => {
                assert_eq!(query, "export outlook");
                assert_eq!(molecule.as_deref(), Some("Imatinib"));
                assert_eq!(geography, "Global");
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "molecule-insight",
            "cache",
            "prune",
            "--config",
            "custom.toml",
            "--no-color",
            "--log-json",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Cache(CacheCommands::Prune))));
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(cli.no_color);
        assert!(cli.log_json);
    }

    #[test]
    fn test_unknown_cache_command_rejected() {
        assert!(Cli::try_parse_from(["molecule-insight", "cache", "shred"]).is_err());
    }
}
