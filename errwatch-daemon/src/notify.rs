//! Notification backends.
//!
//! Delivery is fire-and-forget: a backend logs its own failures and never
//! reports them back to the ingestion cycle.
//!
//! - [`LogNotifier`]: one structured `info!` line per advisory
//! - [`CommandNotifier`]: runs a desktop notification program
//!   (`notify-send` compatible argument layout)
//! - [`DaemonNotifier`]: runtime selection between the two from `[notify]`

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use errwatch_core::config::NotifyConfig;
use errwatch_core::pipeline::Notifier;
use errwatch_core::types::Advisory;

/// Upper bound on how long a notification program may run.
const COMMAND_DEADLINE: Duration = Duration::from_secs(10);

/// Writes each new advisory to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, advisory: &Advisory) {
        info!(
            advisory = %advisory.id,
            class = %advisory.class(),
            severity = ?advisory.severity,
            synopsis = %advisory.synopsis,
            link = %advisory.link,
            "new advisory"
        );
    }
}

/// Spawns `<program> -a <app_name> -t <timeout_ms> <summary> <body>` per advisory.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    app_name: String,
    timeout_ms: u32,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, app_name: impl Into<String>, timeout_ms: u32) -> Self {
        Self {
            program: program.into(),
            app_name: app_name.into(),
            timeout_ms,
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::new(&config.command, &config.app_name, config.timeout_ms)
    }

    /// Program arguments for one advisory.
    pub fn args(&self, advisory: &Advisory) -> Vec<String> {
        vec![
            "-a".to_owned(),
            self.app_name.clone(),
            "-t".to_owned(),
            self.timeout_ms.to_string(),
            summary(advisory),
            body(advisory),
        ]
    }
}

impl Notifier for CommandNotifier {
    async fn notify(&self, advisory: &Advisory) {
        let child = Command::new(&self.program)
            .args(self.args(advisory))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    advisory = %advisory.id,
                    program = %self.program,
                    error = %e,
                    "failed to spawn notification command"
                );
                return;
            }
        };

        match tokio::time::timeout(COMMAND_DEADLINE, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => {
                debug!(advisory = %advisory.id, "notification delivered");
            }
            Ok(Ok(output)) => {
                warn!(
                    advisory = %advisory.id,
                    program = %self.program,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "notification command failed"
                );
            }
            Ok(Err(e)) => {
                warn!(advisory = %advisory.id, error = %e, "notification command failed");
            }
            Err(_) => {
                warn!(
                    advisory = %advisory.id,
                    deadline_secs = COMMAND_DEADLINE.as_secs(),
                    "notification command timed out"
                );
            }
        }
    }
}

/// Notifier chosen at runtime from `[notify] backend`.
#[derive(Debug, Clone)]
pub enum DaemonNotifier {
    Log(LogNotifier),
    Command(CommandNotifier),
}

impl DaemonNotifier {
    /// Build the configured backend. Unknown backends fall back to the log.
    pub fn from_config(config: &NotifyConfig) -> Self {
        match config.backend.as_str() {
            "command" => Self::Command(CommandNotifier::from_config(config)),
            "log" => Self::Log(LogNotifier),
            other => {
                warn!(backend = other, "unknown notify backend, using log");
                Self::Log(LogNotifier)
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::Command(_) => "command",
        }
    }
}

impl Notifier for DaemonNotifier {
    async fn notify(&self, advisory: &Advisory) {
        match self {
            Self::Log(n) => n.notify(advisory).await,
            Self::Command(n) => n.notify(advisory).await,
        }
    }
}

fn summary(advisory: &Advisory) -> String {
    format!("{}: {}", advisory.id, advisory.synopsis)
}

fn body(advisory: &Advisory) -> String {
    match advisory.severity {
        Some(score) => format!("CVSS {score:.1}\n{}", advisory.link),
        None => advisory.link.clone(),
    }
}
