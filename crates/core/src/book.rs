//! The canonical quote set and its persistence.
//!
//! `QuoteBook` owns the in-memory set and mirrors it into a durable store
//! after every mutation. Session-only state (last viewed quote) goes to a
//! separate volatile store.

use crate::config::StorageConfig;
use crate::import::{self, ImportError, ImportSummary};
use crate::models::{default_records, CategoryFilter, Record, RecordSet};
use crate::reconcile::{self, dedupe, ConflictPolicy, ReconciliationResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use storage::KeyValueStore;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("please fill in both the quote text and its category")]
    EmptyField,
    #[error("quote already exists: \"{text}\" ({category})")]
    Duplicate { text: String, category: String },
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct StoreKeys {
    pub quotes: String,
    pub filter: String,
    pub last_viewed: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

impl From<&StorageConfig> for StoreKeys {
    fn from(cfg: &StorageConfig) -> Self {
        Self {
            quotes: cfg.quotes_key.clone(),
            filter: cfg.filter_key.clone(),
            last_viewed: cfg.last_viewed_key.clone(),
        }
    }
}

/// Result of reading the stored blob.
enum Stored {
    Missing,
    Corrupt(String),
    Loaded(RecordSet),
}

pub struct QuoteBook {
    records: Mutex<RecordSet>,
    local: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    keys: StoreKeys,
}

impl QuoteBook {
    /// Loads the canonical set. A missing blob seeds the defaults; an
    /// unreadable one keeps the defaults in memory and leaves the blob alone.
    pub async fn open(
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        keys: StoreKeys,
    ) -> Self {
        let book = Self {
            records: Mutex::new(default_records()),
            local,
            session,
            keys,
        };
        match book.read_stored().await {
            Stored::Loaded(set) => {
                info!(count = set.len(), "loaded quotes from storage");
                *book.records.lock().await = set;
            }
            Stored::Missing => {
                let guard = book.records.lock().await;
                if let Err(e) = book.persist(&guard).await {
                    warn!(error = %e, "could not persist default quotes");
                }
                info!(count = guard.len(), "seeded default quotes");
            }
            Stored::Corrupt(reason) => {
                warn!(%reason, "stored quotes unreadable; using default quotes");
            }
        }
        book
    }

    async fn read_stored(&self) -> Stored {
        let blob = match self.local.get(&self.keys.quotes).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return Stored::Missing,
            Err(e) => return Stored::Corrupt(e.to_string()),
        };
        let value: serde_json::Value = match serde_json::from_str(&blob) {
            Ok(value) => value,
            Err(e) => return Stored::Corrupt(e.to_string()),
        };
        let Some(entries) = value.as_array() else {
            return Stored::Corrupt("stored quotes are not an array".into());
        };
        let valid: RecordSet = entries.iter().filter_map(import::record_from_value).collect();
        if valid.is_empty() && !entries.is_empty() {
            return Stored::Corrupt("no readable quotes in storage".into());
        }
        let unique = dedupe(&valid);
        if unique.len() != entries.len() {
            warn!(
                dropped = entries.len() - unique.len(),
                "dropped invalid or duplicate stored quotes"
            );
        }
        Stored::Loaded(unique)
    }

    /// Refreshes `current` from the durable store so a mutation builds on what
    /// other processes saved. A missing or unreadable blob keeps `current`.
    async fn refresh(&self, current: &mut RecordSet) {
        match self.read_stored().await {
            Stored::Loaded(set) => *current = set,
            Stored::Missing => debug!("no stored quotes; building on in-memory set"),
            Stored::Corrupt(reason) => {
                warn!(%reason, "stored quotes unreadable; building on in-memory set")
            }
        }
    }

    /// Re-reads the durable store, keeping the in-memory set if the blob is
    /// missing or unreadable.
    pub async fn reload(&self) -> RecordSet {
        let mut guard = self.records.lock().await;
        self.refresh(&mut guard).await;
        guard.clone()
    }

    async fn persist(&self, set: &RecordSet) -> Result<(), BookError> {
        let blob = serde_json::to_string(set)?;
        self.local.set(&self.keys.quotes, &blob).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> RecordSet {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Replaces the whole set. Exact duplicates are collapsed first.
    pub async fn replace(&self, set: RecordSet) -> Result<(), BookError> {
        let set = dedupe(&set);
        let mut guard = self.records.lock().await;
        self.persist(&set).await?;
        *guard = set;
        Ok(())
    }

    pub async fn add(&self, text: &str, category: &str) -> Result<Record, BookError> {
        let record = Record::new(text.trim(), category.trim());
        if !record.is_valid() {
            return Err(BookError::EmptyField);
        }
        let mut guard = self.records.lock().await;
        self.refresh(&mut guard).await;
        if guard.contains(&record) {
            return Err(BookError::Duplicate {
                text: record.text,
                category: record.category,
            });
        }
        let mut next = guard.clone();
        next.push(record.clone());
        self.persist(&next).await?;
        *guard = next;
        info!(category = %record.category, "added quote");
        Ok(record)
    }

    /// Imports a JSON batch. Nothing changes unless at least one entry is valid.
    pub async fn import_json(&self, content: &str) -> Result<ImportSummary, BookError> {
        let parsed = import::parse_import(content)?;
        let mut guard = self.records.lock().await;
        self.refresh(&mut guard).await;
        let (merged, added) = import::merge_import(&guard, &parsed.records);
        if added > 0 {
            self.persist(&merged).await?;
            *guard = merged;
        }
        let summary = ImportSummary {
            accepted: parsed.records.len(),
            rejected: parsed.rejected,
            added,
        };
        info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            added = summary.added,
            "imported quotes"
        );
        Ok(summary)
    }

    pub async fn export_json(&self) -> Result<String, BookError> {
        let guard = self.records.lock().await;
        Ok(import::export_json(&guard)?)
    }

    pub async fn categories(&self) -> Vec<String> {
        self.records.lock().await.categories()
    }

    pub async fn filtered(&self, filter: &CategoryFilter) -> Vec<Record> {
        self.records
            .lock()
            .await
            .filtered(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn set_filter(&self, filter: &CategoryFilter) -> Result<(), BookError> {
        self.local.set(&self.keys.filter, filter.as_str()).await?;
        Ok(())
    }

    pub async fn last_filter(&self) -> CategoryFilter {
        match self.local.get(&self.keys.filter).await {
            Ok(Some(value)) => CategoryFilter::parse(&value),
            Ok(None) => CategoryFilter::All,
            Err(e) => {
                warn!(error = %e, "could not read last filter");
                CategoryFilter::All
            }
        }
    }

    pub async fn random(&self) -> Result<Option<Record>, BookError> {
        let mut rng = StdRng::from_entropy();
        self.random_with(&mut rng).await
    }

    /// Picks a quote and remembers it for the rest of the session.
    pub async fn random_with<R: Rng + Send>(
        &self,
        rng: &mut R,
    ) -> Result<Option<Record>, BookError> {
        let picked = {
            let guard = self.records.lock().await;
            if guard.is_empty() {
                return Ok(None);
            }
            let index = rng.gen_range(0..guard.len());
            guard.get(index).cloned()
        };
        if let Some(record) = &picked {
            let blob = serde_json::to_string(record)?;
            self.session.set(&self.keys.last_viewed, &blob).await?;
        }
        Ok(picked)
    }

    pub async fn last_viewed(&self) -> Option<Record> {
        let blob = match self.session.get(&self.keys.last_viewed).await {
            Ok(blob) => blob?,
            Err(e) => {
                warn!(error = %e, "could not read last viewed quote");
                return None;
            }
        };
        match serde_json::from_str::<Record>(&blob) {
            Ok(record) if record.is_valid() => Some(record),
            _ => {
                debug!("ignoring unreadable last viewed quote");
                None
            }
        }
    }

    /// Merges `remote` into the stored set and persists the result when it
    /// changed. The read, merge and write happen under one lock.
    pub async fn reconcile_with(
        &self,
        remote: &RecordSet,
        policy: ConflictPolicy,
    ) -> Result<ReconciliationResult, BookError> {
        let mut guard = self.records.lock().await;
        self.refresh(&mut guard).await;
        let result = reconcile::reconcile(&guard, remote, policy);
        if result.changed {
            self.persist(&result.merged).await?;
            *guard = result.merged.clone();
        }
        Ok(result)
    }
}
