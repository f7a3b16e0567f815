//! Remote sources that supply candidate records for sync.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod fixed;
pub mod http;
pub mod noop;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// A candidate record as observed on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub text: String,
    pub category: String,
}

#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetches the full candidate list. Partial results are never returned.
    async fn fetch(&self) -> Result<Vec<RemoteRecord>, ProviderError>;

    /// Best-effort notification; the remote side is not expected to persist it.
    async fn notify(&self, payload: &serde_json::Value) -> Result<(), ProviderError>;
}
