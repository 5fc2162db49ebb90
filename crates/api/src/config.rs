//! Process configuration, loaded once at startup.

use std::path::PathBuf;

use nova_comfyui::config::EngineConfig;
use nova_core::config::{self, process_env};
use nova_core::error::CoreError;
use nova_core::paths::expand_user;
use nova_training::config::TrainingConfig;

/// Dataset listing root used when neither dataset variable is set.
pub const DEFAULT_DATASET_LISTING_ROOT: &str = "datasets";

/// HTTP server configuration.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `600`). Generation requests
    /// block for the whole poll loop, so this must exceed the poll timeout.
    pub request_timeout_secs: u64,
    /// How long to wait for training watchers after shutdown (default: `10`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `HOST`                  | `0.0.0.0`                |
    /// | `PORT`                  | `8000`                   |
    /// | `CORS_ORIGINS`          | `http://localhost:3000`  |
    /// | `REQUEST_TIMEOUT_SECS`  | `600`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `10`                     |
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cors_origins = config::string(lookup, "CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: config::string(lookup, "HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: config::parse_or(lookup, "PORT", 8000)?,
            cors_origins,
            request_timeout_secs: config::parse_or(lookup, "REQUEST_TIMEOUT_SECS", 600)?,
            shutdown_timeout_secs: config::parse_or(lookup, "SHUTDOWN_TIMEOUT_SECS", 10)?,
        })
    }
}

/// Everything the worker needs, built before any component is constructed.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub training: TrainingConfig,
    /// Root browsed by the dataset listing endpoint.
    pub dataset_listing_root: PathBuf,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let training = TrainingConfig::from_lookup(&lookup);
        let dataset_listing_root = training
            .dataset_root
            .clone()
            .unwrap_or_else(|| expand_user(DEFAULT_DATASET_LISTING_ROOT));

        Ok(Self {
            server: ServerConfig::from_lookup(&lookup)?,
            engine: EngineConfig::from_lookup(&lookup)?,
            training,
            dataset_listing_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<WorkerConfig, CoreError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(move |k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(cfg.server.request_timeout_secs, 600);
        assert_eq!(cfg.dataset_listing_root, PathBuf::from("datasets"));
    }

    #[test]
    fn cors_origins_are_split() {
        let cfg = load(&[("CORS_ORIGINS", "http://a.test, http://b.test,")]).unwrap();
        assert_eq!(cfg.server.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn listing_root_follows_dataset_root() {
        let cfg = load(&[("DATASET_ROOT", "/srv/datasets")]).unwrap();
        assert_eq!(cfg.dataset_listing_root, PathBuf::from("/srv/datasets"));
    }

    #[test]
    fn malformed_port_is_config_error() {
        assert_matches!(load(&[("PORT", "eighty")]), Err(CoreError::Config(_)));
    }
}
