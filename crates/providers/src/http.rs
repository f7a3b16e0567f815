use crate::{ProviderError, RemoteRecord, RemoteSource};
use bytes::Bytes;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    pub url: String,
    /// Only the first `limit` entries of the response are considered.
    pub limit: usize,
    /// Field of each entry used as the record text.
    pub text_field: String,
    /// Category assigned to every fetched record.
    pub category: String,
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            url: "https://jsonplaceholder.typicode.com/posts".to_string(),
            limit: 5,
            text_field: "title".to_string(),
            category: "Server".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct HttpRemoteSource {
    client: Client,
    cfg: Arc<HttpSourceConfig>,
}

impl HttpRemoteSource {
    pub fn new(cfg: HttpSourceConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            cfg: Arc::new(cfg),
        })
    }
}

/// Maps a generic JSON listing into candidate records.
pub fn map_entries(
    body: &serde_json::Value,
    cfg: &HttpSourceConfig,
) -> Result<Vec<RemoteRecord>, ProviderError> {
    let entries = body
        .as_array()
        .ok_or_else(|| ProviderError::Decode("expected a JSON array".into()))?;
    let records = entries
        .iter()
        .take(cfg.limit)
        .filter_map(|entry| {
            let text = entry.get(&cfg.text_field)?.as_str()?;
            if text.trim().is_empty() {
                return None;
            }
            Some(RemoteRecord {
                text: text.to_string(),
                category: cfg.category.clone(),
            })
        })
        .collect();
    Ok(records)
}

#[async_trait::async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch(&self) -> Result<Vec<RemoteRecord>, ProviderError> {
        let resp = self
            .client
            .get(&self.cfg.url)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
            return Err(ProviderError::RequestFailed(format!(
                "status {} body {:?}",
                status, body
            )));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let records = map_entries(&body, &self.cfg)?;
        tracing::debug!(url = %self.cfg.url, count = records.len(), "fetched remote records");
        Ok(records)
    }

    async fn notify(&self, payload: &serde_json::Value) -> Result<(), ProviderError> {
        let resp = self
            .client
            .post(&self.cfg.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
            return Err(ProviderError::RequestFailed(format!(
                "status {} body {:?}",
                status, body
            )));
        }
        Ok(())
    }
}
