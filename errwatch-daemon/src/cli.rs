//! CLI argument definitions for errwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// errwatch advisory feed daemon.
///
/// Polls the errata feed, enriches new security advisories with CVSS
/// scores, notifies and records them until SIGINT/SIGTERM.
#[derive(Parser, Debug)]
#[command(name = "errwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to errwatch.toml configuration file.
    #[arg(short, long, default_value = "/etc/errwatch/errwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Run a single ingestion cycle, print its report and exit.
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = DaemonCli::try_parse_from(["errwatch-daemon"]).expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/etc/errwatch/errwatch.toml"));
        assert!(cli.log_level.is_none());
        assert!(!cli.validate);
        assert!(!cli.once);
    }

    #[test]
    fn overrides_and_flags() {
        let cli = DaemonCli::try_parse_from([
            "errwatch-daemon",
            "-c",
            "/tmp/errwatch.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--once",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/tmp/errwatch.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.once);
    }
}
