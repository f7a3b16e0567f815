//! Plain-text presentation of quotes and command results.

use quotebook_core::import::ImportSummary;
use quotebook_core::sync::SyncOutcome;
use quotebook_core::{CategoryFilter, Record};

pub const NO_QUOTES: &str = "No quotes available.";
pub const NO_QUOTES_IN_CATEGORY: &str = "No quotes found for this category.";

pub fn quote(record: &Record) -> String {
    format!("\"{}\" - {}", record.text, record.category)
}

pub fn quote_list(records: &[Record]) -> String {
    if records.is_empty() {
        return NO_QUOTES_IN_CATEGORY.to_string();
    }
    records.iter().map(quote).collect::<Vec<_>>().join("\n")
}

/// Filter choices, `all` first.
pub fn categories(categories: &[String], selected: &CategoryFilter) -> String {
    std::iter::once(CategoryFilter::All.as_str().to_string())
        .chain(categories.iter().cloned())
        .map(|c| {
            let marker = if c == selected.as_str() { "*" } else { " " };
            format!("{marker} {c}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn import_summary(summary: &ImportSummary) -> String {
    let mut line = format!("Quotes imported successfully! ({} new", summary.added);
    if summary.accepted > summary.added {
        line.push_str(&format!(", {} already present", summary.accepted - summary.added));
    }
    if summary.rejected > 0 {
        line.push_str(&format!(", {} invalid skipped", summary.rejected));
    }
    line.push(')');
    line
}

/// One-line description of a sync cycle for terminal output.
pub fn sync_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Applied(report) => format!(
            "{} ({} added, {} updated at {})",
            quotebook_core::sync::SYNC_NOTIFICATION,
            report.appended,
            report.replaced,
            report.finished_at.format("%H:%M:%S")
        ),
        SyncOutcome::Unchanged { fetched } => {
            format!("Already up to date ({fetched} remote quotes checked).")
        }
        SyncOutcome::FetchFailed(reason) => format!("Server unreachable, nothing changed: {reason}"),
        SyncOutcome::PersistFailed(reason) => format!("Sync could not be saved: {reason}"),
        SyncOutcome::Skipped => "A sync is already running.".to_string(),
        SyncOutcome::Cancelled => "Sync cancelled.".to_string(),
    }
}
