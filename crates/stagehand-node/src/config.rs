use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::sync::Arc;

use stagehand_engine::EngineConfig;
use stagehand_store::rest::{RestConfig, RestStore};
use stagehand_store::{memory::MemoryStore, MarketStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node: NodeSettings,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "rest" against the hosted row store, or "memory" for dry runs.
    pub backend: String,
    pub url: String,
    /// Service-role key. Usually injected via STAGEHAND_SERVICE_KEY
    /// rather than written into the config file.
    pub service_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "compact".
    pub format: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node: NodeSettings {
                name: "stagehand".to_string(),
            },
            store: StoreConfig {
                backend: "rest".to_string(),
                url: String::new(),
                service_key: String::new(),
                timeout_secs: 15,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            engine: EngineConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        // Env overrides are applied by main so precedence stays in one place.
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Environment variable overrides, applied between the config file
    /// and CLI arguments.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(backend) = env::var("STAGEHAND_STORE_BACKEND") {
            if !backend.is_empty() {
                self.store.backend = backend;
            }
        }
        if let Ok(url) = env::var("STAGEHAND_STORE_URL") {
            if !url.is_empty() {
                self.store.url = url;
            }
        }
        if let Ok(key) = env::var("STAGEHAND_SERVICE_KEY") {
            if !key.is_empty() {
                self.store.service_key = key;
            }
        }
        if let Ok(timeout) = env::var("STAGEHAND_STORE_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.store.timeout_secs = secs;
            }
        }
        if let Ok(level) = env::var("STAGEHAND_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(interval) = env::var("STAGEHAND_TICK_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse() {
                self.engine.tick_interval_secs = secs;
            }
        }
        if let Ok(wallet) = env::var("STAGEHAND_OWNER_WALLET") {
            if !wallet.is_empty() {
                self.engine.owner_wallet = wallet;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.store.backend.as_str() {
            "memory" => {}
            "rest" => {
                if self.store.url.is_empty() {
                    anyhow::bail!(
                        "store.url is required for the rest backend (or set STAGEHAND_STORE_URL)"
                    );
                }
                if self.store.service_key.is_empty() {
                    anyhow::bail!(
                        "store.service_key is required for the rest backend (or set STAGEHAND_SERVICE_KEY)"
                    );
                }
            }
            other => anyhow::bail!("unknown store backend '{}'", other),
        }
        self.engine.validate().context("invalid engine config")?;
        Ok(())
    }

    /// Build the configured store backend.
    pub fn build_store(&self) -> Result<Arc<dyn MarketStore>> {
        match self.store.backend.as_str() {
            "memory" => Ok(Arc::new(MemoryStore::new())),
            "rest" => {
                let store = RestStore::new(RestConfig {
                    base_url: self.store.url.clone(),
                    service_key: self.store.service_key.clone(),
                    timeout_secs: self.store.timeout_secs,
                })?;
                Ok(Arc::new(store))
            }
            other => anyhow::bail!("unknown store backend '{}'", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: NodeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.store.backend, "rest");
        assert_eq!(
            parsed.engine.tick_interval_secs,
            config.engine.tick_interval_secs
        );
        assert_eq!(parsed.engine.roster.len(), config.engine.roster.len());
    }

    #[test]
    fn test_rest_backend_requires_url_and_key() {
        let config = NodeConfig::default();
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.store.url = "https://rows.example.com".to_string();
        config.store.service_key = "service-key".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_memory_backend_needs_no_credentials() {
        let mut config = NodeConfig::default();
        config.store.backend = "memory".to_string();
        config.validate().unwrap();
        config.build_store().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("STAGEHAND_STORE_URL", "https://env.example.com");
        env::set_var("STAGEHAND_SERVICE_KEY", "env-key");
        env::set_var("STAGEHAND_TICK_INTERVAL_SECS", "45");

        let mut config = NodeConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.store.url, "https://env.example.com");
        assert_eq!(config.store.service_key, "env-key");
        assert_eq!(config.engine.tick_interval_secs, 45);

        env::remove_var("STAGEHAND_STORE_URL");
        env::remove_var("STAGEHAND_SERVICE_KEY");
        env::remove_var("STAGEHAND_TICK_INTERVAL_SECS");
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stagehand.toml");
        let mut config = NodeConfig::default();
        config.store.backend = "memory".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = NodeConfig::from_file(&path).unwrap();
        assert_eq!(loaded.store.backend, "memory");
        assert_eq!(loaded.engine.owner_wallet, config.engine.owner_wallet);
    }
}
