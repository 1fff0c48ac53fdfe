//! Logging initialization for errwatch-daemon.
//!
//! Configures `tracing-subscriber` based on the `[general]` section
//! of `ErrwatchConfig`. Supports JSON structured logging and
//! human-readable pretty format.
//!
//! Every ingestion cycle runs inside an `ingest_cycle` span carrying a
//! `cycle_id`. Span close events are enabled so each cycle ends with one
//! line holding its id and busy/idle time.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use errwatch_core::config::GeneralConfig;

/// Dependencies capped at `warn` unless the level is a full directive.
///
/// The HTTP stack logs every connection and the HTML parser every
/// recovered markup error on CVE pages.
const QUIET_TARGETS: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "html5ever",
    "selectors",
    "rusqlite",
];

/// Build the default filter directive for a configured log level.
///
/// A bare level (`"info"`) is expanded with `QUIET_TARGETS`. A value that
/// already contains target directives (`"errwatch_ingest=trace,warn"`) is
/// used verbatim.
pub fn default_directive(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_owned();
    }

    let mut directive = level.to_owned();
    for target in QUIET_TARGETS {
        directive.push_str(&format!(",{target}=warn"));
    }
    directive
}

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
/// `RUST_LOG`, when set, wins over `config.log_level`.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines (default for production)
/// * `"pretty"` - Human-readable colored output (for development)
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(&config.log_level)).map_err(|e| {
            anyhow::anyhow!("invalid log level '{}': {}", config.log_level, e)
        })?,
    };

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(FmtSpan::CLOSE),
                )
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)
                })?;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                config.log_format
            ));
        }
    }

    Ok(())
}
