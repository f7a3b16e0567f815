use anyhow::{Context, Result};
use providers::RemoteSource;
use quotebook_core::config::AppConfig;
use quotebook_core::import::ImportSummary;
use quotebook_core::sync::{build_remote, SyncService};
use quotebook_core::{ConflictPolicy, QuoteBook, StoreKeys};
use std::path::Path;
use std::sync::Arc;
use storage::{KeyValueStore, SqliteStore};

/// Everything a command needs: configuration, the quote book and the remote.
pub struct App {
    pub config: AppConfig,
    pub book: Arc<QuoteBook>,
    pub remote: Arc<dyn RemoteSource>,
}

impl App {
    pub async fn open(config: AppConfig, session: Arc<dyn KeyValueStore>) -> Result<Self> {
        let local = SqliteStore::open(&config.storage.path)
            .await
            .with_context(|| format!("open quote store at {}", config.storage.path))?;
        Self::with_stores(config, Arc::new(local), session).await
    }

    pub async fn with_stores(
        config: AppConfig,
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let remote = build_remote(&config.remote).context("configure remote source")?;
        let book = QuoteBook::open(local, session, StoreKeys::from(&config.storage)).await;
        Ok(Self {
            config,
            book: Arc::new(book),
            remote,
        })
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteSource>) -> Self {
        self.remote = remote;
        self
    }

    /// Sync service using `policy`, or the configured one.
    pub fn sync_service(&self, policy: Option<ConflictPolicy>) -> Arc<SyncService> {
        Arc::new(SyncService::new(
            Arc::clone(&self.book),
            Arc::clone(&self.remote),
            policy.unwrap_or(self.config.sync.policy),
        ))
    }

    pub async fn export_to(&self, path: &Path) -> Result<usize> {
        let body = self.book.export_json().await?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, body)
            .await
            .with_context(|| format!("write export to {}", path.display()))?;
        Ok(self.book.len().await)
    }

    pub async fn import_from(&self, path: &Path) -> Result<ImportSummary> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read import file {}", path.display()))?;
        Ok(self.book.import_json(&content).await?)
    }
}
