use crate::{ProviderError, RemoteRecord, RemoteSource};

/// Source for offline use: never has anything to offer.
#[derive(Debug, Default)]
pub struct NoopRemoteSource;

#[async_trait::async_trait]
impl RemoteSource for NoopRemoteSource {
    async fn fetch(&self) -> Result<Vec<RemoteRecord>, ProviderError> {
        Ok(Vec::new())
    }

    async fn notify(&self, _payload: &serde_json::Value) -> Result<(), ProviderError> {
        Ok(())
    }
}
