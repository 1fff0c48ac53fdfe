//! CLI argument parsing using clap derive API
//!
//! Purely declarative, no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use errwatch_core::types::AdvisoryClass;

/// errwatch -- Red Hat errata feed watcher.
///
/// Use `errwatch <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "errwatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to the errwatch.toml configuration file.
    #[arg(short, long, default_value = "errwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List recorded advisories, most recent first.
    List(ListArgs),

    /// Run one ingestion cycle against the configured feed and store.
    Check,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- list ----

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show advisories of this class.
    #[arg(long, value_enum)]
    pub class: Option<ClassFilter>,
}

/// Advisory class selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassFilter {
    /// Security advisories.
    #[value(name = "RHSA", alias = "rhsa")]
    Rhsa,
    /// Bug fix advisories.
    #[value(name = "RHBA", alias = "rhba")]
    Rhba,
    /// Enhancement advisories.
    #[value(name = "RHEA", alias = "rhea")]
    Rhea,
}

impl ClassFilter {
    pub fn class(self) -> AdvisoryClass {
        match self {
            Self::Rhsa => AdvisoryClass::Security,
            Self::Rhba => AdvisoryClass::Bugfix,
            Self::Rhea => AdvisoryClass::Enhancement,
        }
    }
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, feed, store, notify, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}
