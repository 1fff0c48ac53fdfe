//! `errwatch list` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use errwatch_core::config::ErrwatchConfig;
use errwatch_core::error::ErrwatchError;
use errwatch_core::pipeline::AdvisoryStore;
use errwatch_core::types::AdvisoryRecord;
use errwatch_store::SqliteStore;

use crate::cli::{ClassFilter, ListArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `list` command.
///
/// A store file that does not exist yet lists as empty and is not created.
pub async fn execute(
    args: ListArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = ErrwatchConfig::load(config_path).await?;

    let store_path = Path::new(&config.store.path);
    let records = if store_path.exists() {
        let store = SqliteStore::open(store_path).map_err(ErrwatchError::from)?;
        store.list_all().await.map_err(ErrwatchError::from)?
    } else {
        debug!(path = %store_path.display(), "advisory store does not exist yet");
        Vec::new()
    };

    let report = build_list_report(config.store.path.clone(), args.class, records);
    writer.render(&report)
}

/// Filter store records (already most recent first) by class.
pub fn build_list_report(
    store: String,
    filter: Option<ClassFilter>,
    records: Vec<AdvisoryRecord>,
) -> ListReport {
    let class = filter.map(ClassFilter::class);
    let advisories = records
        .into_iter()
        .filter(|r| class.as_ref().is_none_or(|c| r.advisory.class() == *c))
        .collect();

    ListReport {
        store,
        class: class.map(|c| c.label().to_owned()),
        advisories,
    }
}

/// Recorded advisories listing.
#[derive(Serialize)]
pub struct ListReport {
    /// Store file path
    pub store: String,
    /// Class filter applied, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Matching records, most recent first
    pub advisories: Vec<AdvisoryRecord>,
}

impl Render for ListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.advisories.is_empty() {
            return writeln!(w, "No advisories recorded in {}", self.store);
        }

        let header = format!(
            "{:<16}{:<5}{:<64}{}",
            "ADVISORY", "CVSS", "SYNOPSIS", "OBSERVED"
        );
        writeln!(w, "{}", header.bold())?;
        for record in &self.advisories {
            writeln!(w, "{}", format_row(record))?;
        }
        Ok(())
    }
}

fn format_row(record: &AdvisoryRecord) -> String {
    let advisory = &record.advisory;
    let score = advisory
        .severity
        .map_or_else(|| "-".to_owned(), |s| format!("{s:.1}"));
    format!(
        "{:<16}{:<5}{:<64}{}",
        advisory.id.as_str(),
        score,
        advisory.synopsis,
        record.observed_at.format("%Y-%m-%d %H:%M:%S")
    )
}
