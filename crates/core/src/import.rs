//! JSON file import and export of record sets.

use crate::models::{Record, RecordSet};
use crate::reconcile::dedupe;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("error reading the file: {0}")]
    InvalidJson(String),
    #[error("invalid JSON format: expected an array of quotes")]
    NotAnArray,
    #[error("no valid quotes found ({rejected} entries rejected)")]
    NoValidRecords { rejected: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImport {
    pub records: RecordSet,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub accepted: usize,
    pub rejected: usize,
    /// Records that were not already present in the canonical set.
    pub added: usize,
}

/// Parses an uploaded batch. Entries lacking a non-empty string `text` or
/// `category` are dropped one by one; the batch only fails when nothing is
/// left.
pub fn parse_import(content: &str) -> Result<ParsedImport, ImportError> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| ImportError::InvalidJson(e.to_string()))?;
    let entries = value.as_array().ok_or(ImportError::NotAnArray)?;

    let mut records = Vec::with_capacity(entries.len());
    let mut rejected = 0usize;
    for entry in entries {
        match record_from_value(entry) {
            Some(record) => records.push(record),
            None => rejected += 1,
        }
    }
    if records.is_empty() {
        return Err(ImportError::NoValidRecords { rejected });
    }
    if rejected > 0 {
        tracing::debug!(rejected, "dropped malformed import entries");
    }
    Ok(ParsedImport {
        records: records.into(),
        rejected,
    })
}

pub(crate) fn record_from_value(value: &serde_json::Value) -> Option<Record> {
    let text = value.get("text")?.as_str()?;
    let category = value.get("category")?.as_str()?;
    let record = Record::new(text, category);
    record.is_valid().then_some(record)
}

/// Appends `incoming` to `canonical` and collapses exact duplicates.
pub fn merge_import(canonical: &RecordSet, incoming: &RecordSet) -> (RecordSet, usize) {
    let combined: RecordSet = canonical.iter().chain(incoming.iter()).cloned().collect();
    let merged = dedupe(&combined);
    let added = merged.len().saturating_sub(dedupe(canonical).len());
    (merged, added)
}

pub fn export_json(set: &RecordSet) -> serde_json::Result<String> {
    serde_json::to_string_pretty(set)
}
