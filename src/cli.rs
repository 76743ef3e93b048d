//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::PolicyKind;
use clap::Parser;
use std::path::PathBuf;

/// Fanout - invoke services concurrently and aggregate their answers
///
/// Every service is called in parallel; the results are combined under
/// the selected failure policy.
///
/// Examples:
///   fanout --message hello,world
///   fanout --services Good,Bad --fail Bad --policy fail-soft --message msg
///   fanout --services Good1,Bad,Good2 --fail Bad --policy fail-partial --message x,y,z
///   fanout --policy completion-order --message ping --format json
///   fanout --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Messages to send (comma-separated)
    ///
    /// A single message is sent to every service. Several messages are
    /// paired with services by position and must match their count.
    #[arg(
        short,
        long,
        value_name = "MSG",
        value_delimiter = ',',
        required_unless_present = "init_config"
    )]
    pub message: Vec<String>,

    /// Failure-handling policy
    #[arg(short, long, value_name = "POLICY", env = "FANOUT_POLICY")]
    pub policy: Option<PolicyKind>,

    /// Service ids to call (comma-separated), replacing the configured services
    #[arg(short, long, value_name = "IDS", value_delimiter = ',')]
    pub services: Option<Vec<String>>,

    /// Service ids that should fail (comma-separated)
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub fail: Option<Vec<String>>,

    /// Value substituted for failed services under fail-soft
    #[arg(long, value_name = "VALUE")]
    pub fallback: Option<String>,

    /// Seconds to wait for the aggregate before giving up
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fanout.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .fanout.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
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
        if self.init_config {
            return Ok(());
        }

        if self.message.is_empty() {
            return Err("At least one message is required".to_string());
        }

        if let Some(ref services) = self.services {
            if services.is_empty() || services.iter().any(|s| s.trim().is_empty()) {
                return Err("Service ids must not be empty".to_string());
            }
            if self.message.len() > 1 && self.message.len() != services.len() {
                return Err(format!(
                    "Got {} messages for {} services; pass one message or one per service",
                    self.message.len(),
                    services.len()
                ));
            }
        }

        if let (Some(services), Some(failing)) = (&self.services, &self.fail) {
            if let Some(unknown) = failing.iter().find(|id| !services.contains(id)) {
                return Err(format!("--fail names unknown service '{}'", unknown));
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }
}
