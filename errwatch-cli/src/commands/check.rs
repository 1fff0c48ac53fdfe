//! `errwatch check` command handler
//!
//! Runs exactly one ingestion cycle with the configured feed and store.
//! New advisories are announced through the log notifier and recorded.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use errwatch_core::config::ErrwatchConfig;
use errwatch_core::error::ErrwatchError;
use errwatch_daemon::notify::LogNotifier;
use errwatch_ingest::{CycleOutcome, CycleReport, FeedIngestor, ReqwestFetcher};
use errwatch_store::SqliteStore;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `check` command.
///
/// # Errors
///
/// `CliError::Command` when the cycle could not fetch or parse the feed.
pub async fn execute(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    let config = ErrwatchConfig::load(config_path).await?;

    let store = SqliteStore::open(&config.store.path).map_err(ErrwatchError::from)?;
    let http = ReqwestFetcher::new(
        Duration::from_secs(config.feed.request_timeout_secs),
        &config.feed.user_agent,
    )
    .map_err(ErrwatchError::from)?;

    info!(feed = %config.feed.url, "running one ingestion cycle");
    let ingestor = FeedIngestor::from_config(
        &config.feed,
        Arc::new(http),
        Arc::new(store),
        Arc::new(LogNotifier),
    );
    let report = ingestor.ingest().await;

    writer.render(&report)?;

    match &report.outcome {
        CycleOutcome::Completed => Ok(()),
        CycleOutcome::FeedUnavailable(reason) | CycleOutcome::FeedUnparsable(reason) => Err(
            CliError::Command(format!("ingestion cycle failed: {reason}")),
        ),
    }
}

impl Render for CycleReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let status = match &self.outcome {
            CycleOutcome::Completed => "COMPLETED".green().bold(),
            CycleOutcome::FeedUnavailable(_) => "FEED UNAVAILABLE".red().bold(),
            CycleOutcome::FeedUnparsable(_) => "FEED UNPARSABLE".red().bold(),
        };
        writeln!(w, "Cycle {}: {}", self.cycle_id, status)?;
        if let CycleOutcome::FeedUnavailable(reason) | CycleOutcome::FeedUnparsable(reason) =
            &self.outcome
        {
            writeln!(w, "  Reason: {reason}")?;
        }

        writeln!(w, "  Entries:     {}", self.entries)?;
        writeln!(w, "  Malformed:   {}", self.malformed)?;
        writeln!(w, "  Known:       {}", self.known)?;
        writeln!(w, "  New:         {}", self.new_advisories.len())?;
        writeln!(w, "  Persisted:   {}", self.persisted)?;
        if self.lookup_failures + self.duplicates + self.persist_failures > 0 {
            writeln!(
                w,
                "  Skipped:     {} lookup failures, {} duplicates, {} persist failures",
                self.lookup_failures, self.duplicates, self.persist_failures
            )?;
        }
        writeln!(w, "  Elapsed:     {} ms", self.elapsed_ms)?;

        if !self.new_advisories.is_empty() {
            writeln!(w)?;
            for advisory in &self.new_advisories {
                writeln!(w, "  {advisory}")?;
            }
        }
        Ok(())
    }
}
