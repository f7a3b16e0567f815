use crate::{ProviderError, RemoteRecord, RemoteSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Serves a fixed candidate list, or fails every fetch with a fixed reason.
#[derive(Debug, Default)]
pub struct StaticRemoteSource {
    records: Vec<RemoteRecord>,
    failure: Option<String>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
    notified: Mutex<Vec<serde_json::Value>>,
}

impl StaticRemoteSource {
    pub fn new(records: Vec<RemoteRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Holds every fetch for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn notified(&self) -> Vec<serde_json::Value> {
        self.notified
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl RemoteSource for StaticRemoteSource {
    async fn fetch(&self) -> Result<Vec<RemoteRecord>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(reason) => Err(ProviderError::Unavailable(reason.clone())),
            None => Ok(self.records.clone()),
        }
    }

    async fn notify(&self, payload: &serde_json::Value) -> Result<(), ProviderError> {
        if let Some(reason) = &self.failure {
            return Err(ProviderError::Unavailable(reason.clone()));
        }
        if let Ok(mut notified) = self.notified.lock() {
            notified.push(payload.clone());
        }
        Ok(())
    }
}
