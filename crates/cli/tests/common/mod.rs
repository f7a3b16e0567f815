#![allow(dead_code)]

use cli::app::App;
use providers::RemoteRecord;
use quotebook_core::config::AppConfig;
use std::sync::Arc;
use storage::{MemoryStore, SqliteStore};

pub fn remote(pairs: &[(&str, &str)]) -> Vec<RemoteRecord> {
    pairs
        .iter()
        .map(|(text, category)| RemoteRecord {
            text: text.to_string(),
            category: category.to_string(),
        })
        .collect()
}

pub async fn sqlite_app(dir: &std::path::Path) -> (App, SqliteStore) {
    let mut cfg = AppConfig::default();
    cfg.remote.provider = "noop".into();
    cfg.storage.path = dir.join("quotes.db").to_string_lossy().into_owned();
    let local = SqliteStore::open(&cfg.storage.path).await.unwrap();
    let app = App::with_stores(cfg, Arc::new(local.clone()), Arc::new(MemoryStore::new()))
        .await
        .unwrap();
    (app, local)
}
