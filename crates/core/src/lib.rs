//! Core library: quote records, reconciliation, import/export, sync.

pub mod book;
pub mod config;
pub mod import;
pub mod models;
pub mod reconcile;
pub mod sync;

pub use book::{BookError, QuoteBook, StoreKeys};
pub use models::{CategoryFilter, Record, RecordSet};
pub use reconcile::{dedupe, reconcile, ConflictPolicy, ReconciliationResult};
