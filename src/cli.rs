//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Apex - deal intelligence from the terminal
///
/// Upload offering memos, browse extracted real-estate metrics, and ask
/// questions with page-level citations against the Apex backend.
///
/// Examples:
///   apex list
///   apex upload ./maple_court_om.pdf
///   apex show 3f2a9c
///   apex ask 3f2a9c "What is the in-place NOI?"
///   apex file 3f2a9c -o maple_court.pdf
///   apex serve --port 3000
///   apex --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Base URL of the Apex backend
    ///
    /// Overrides the [api] base_url setting from .apex.toml.
    #[arg(long, global = true, value_name = "URL", env = "APEX_API_URL")]
    pub api_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .apex.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .apex.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show portfolio metrics and the list of deals
    List {
        /// Order deals by creation date, newest first
        #[arg(long)]
        newest_first: bool,
    },

    /// Show the extracted metrics of one document
    Show {
        /// Document id
        id: String,
    },

    /// Upload a PDF for extraction
    Upload {
        /// Path to the PDF file
        file: PathBuf,
    },

    /// Ask a question about a document
    ///
    /// Without a question, questions are read from stdin one per line.
    Ask {
        /// Document id
        id: String,

        /// Question to ask
        question: Option<String>,

        /// Jump to the page of the Nth cited source (1-based)
        #[arg(long, value_name = "N")]
        source: Option<usize>,
    },

    /// Download a document's PDF
    File {
        /// Document id
        id: String,

        /// Output file path
        #[arg(short, long, default_value = "document.pdf", value_name = "FILE")]
        output: PathBuf,
    },

    /// Run the local file gateway
    Serve {
        /// Address to bind
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },
}

/// Output format for rendered views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain-text tables (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A command is required (try --help)".to_string());
        };

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match command {
            Command::Show { id } | Command::File { id, .. } if id.trim().is_empty() => {
                return Err("Document id must not be empty".to_string());
            }
            Command::Ask { id, source, .. } => {
                if id.trim().is_empty() {
                    return Err("Document id must not be empty".to_string());
                }
                if *source == Some(0) {
                    return Err("Source numbers start at 1".to_string());
                }
            }
            Command::Upload { file } => {
                if !file.exists() {
                    return Err(format!("File does not exist: {}", file.display()));
                }
                if !file.is_file() {
                    return Err(format!("Path is not a file: {}", file.display()));
                }
            }
            Command::Serve {
                port: Some(0), ..
            } => {
                return Err("Port must be between 1 and 65535".to_string());
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_by_default` is the `[general] verbose` config value; `--quiet` wins over both.
    pub fn log_level(&self, verbose_by_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_by_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
