use crate::reconcile::ConflictPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file (or `sqlite:` URL) holding the durable store.
    pub path: String,
    pub quotes_key: String,
    pub filter_key: String,
    pub last_viewed_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "data/quotebook.db".to_string(),
            quotes_key: "quotes".to_string(),
            filter_key: "lastFilter".to_string(),
            last_viewed_key: "lastViewedQuote".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// `http` or `noop`.
    pub provider: String,
    pub url: String,
    pub limit: usize,
    pub text_field: String,
    pub category: String,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            provider: "http".to_string(),
            url: "https://jsonplaceholder.typicode.com/posts".to_string(),
            limit: 5,
            text_field: "title".to_string(),
            category: "Server".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_secs: u64,
    pub policy: ConflictPolicy,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            policy: ConflictPolicy::RemoteWins,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: "quotes.json".to_string(),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("QUOTEBOOK")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotebook.toml");
        std::fs::write(
            &path,
            "[sync]\npolicy = \"keep-both-if-new\"\n\n[remote]\nlimit = 3\n",
        )
        .unwrap();
        let cfg = load(Some(path.to_str().unwrap())).unwrap();

        assert_eq!(cfg.sync.policy, ConflictPolicy::KeepBothIfNew);
        assert_eq!(cfg.sync.interval_secs, 30);
        assert_eq!(cfg.remote.limit, 3);
        assert_eq!(cfg.remote.category, "Server");
        assert_eq!(cfg.storage.quotes_key, "quotes");
    }
}
