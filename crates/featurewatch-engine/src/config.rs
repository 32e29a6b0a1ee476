//! Engine configuration, layered the way `rustible` layers its config:
//! defaults, then a TOML file, then environment overrides via the
//! `config` crate, with `dotenvy` loading a local `.env` for development.

use serde::{Deserialize, Serialize};

/// Tunables for [`crate::producer::process_search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Advisory lock TTL in milliseconds. Defaults to a fixed 2-minute lifetime.
    pub lock_ttl_ms: i64,
    /// Page size `FeatureFetcher` implementations are expected to use
    /// internally; carried here so a future paginated fetcher has a single
    /// place to read it from.
    pub feature_page_size: usize,
    pub blob_store_root: String,
    pub sqlite_path: String,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            lock_ttl_ms: 120_000,
            feature_page_size: 500,
            blob_store_root: "./data/blobs".to_string(),
            sqlite_path: "./data/featurewatch.db".to_string(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub producer: ProducerConfig,
    /// Bound on concurrently in-flight `process_search` tasks.
    pub max_concurrent_searches: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            producer: ProducerConfig::default(),
            max_concurrent_searches: 8,
        }
    }
}

impl EngineConfig {
    /// Load configuration from (in ascending precedence): built-in
    /// defaults, `./featurewatch.toml` if present, then `FEATUREWATCH__*`
    /// environment variables. Reads a local `.env` first via `dotenvy`,
    /// ignoring its absence.
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let defaults = config::Config::try_from(&EngineConfig::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("featurewatch").required(false))
            .add_source(
                config::Environment::with_prefix("FEATUREWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.producer.lock_ttl_ms, 120_000);
        assert_eq!(cfg.max_concurrent_searches, 8);
    }
}
