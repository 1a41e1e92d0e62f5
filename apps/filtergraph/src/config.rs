//! # Configuration
//!
//! Layered application configuration. Later layers win:
//!
//! 1. Built-in defaults
//! 2. TOML file given with `--config`
//! 3. Environment (`FILTERGRAPH_CORS_ORIGINS`, `FILTERGRAPH_RATE_LIMIT`)
//! 4. Command-line flags (applied in `cli`)
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [store]
//! backend = "redb"
//! path = "filtergraph.db"
//!
//! [http]
//! cors_origins = "https://app.example.com"
//! rate_limit = 100
//! body_limit_bytes = 2097152
//! ```

use filtergraph_core::FilterError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding allowed CORS origins (`*` or a comma list).
pub const ENV_CORS_ORIGINS: &str = "FILTERGRAPH_CORS_ORIGINS";

/// Environment variable holding the global requests-per-second limit.
pub const ENV_RATE_LIMIT: &str = "FILTERGRAPH_RATE_LIMIT";

/// Largest config file accepted (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub http: HttpConfig,
}

/// `[server]`: listen address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// JSON dataset file loaded into memory.
    File,
    /// redb database.
    #[default]
    Redb,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Redb => write!(f, "redb"),
        }
    }
}

/// `[store]`: where relationship data lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: Backend,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Redb,
            path: PathBuf::from("filtergraph.db"),
        }
    }
}

/// `[http]`: middleware settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// `None` allows localhost only; `"*"` allows every origin.
    pub cors_origins: Option<String>,
    /// Requests per second across all clients. 0 disables limiting.
    pub rate_limit: u32,
    pub body_limit_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            rate_limit: 100,
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, FilterError> {
        toml::from_str(text)
            .map_err(|e| FilterError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, FilterError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            FilterError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(FilterError::SerializationError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            FilterError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, FilterError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored with a
    /// warning.
    pub fn apply_env_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(origins) = lookup(ENV_CORS_ORIGINS) {
            self.http.cors_origins = Some(origins);
        }

        if let Some(raw) = lookup(ENV_RATE_LIMIT) {
            match raw.trim().parse::<u32>() {
                Ok(limit) => self.http.rate_limit = limit,
                Err(_) => tracing::warn!(
                    "Ignoring {}={:?}: not a non-negative integer",
                    ENV_RATE_LIMIT,
                    raw
                ),
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.addr(), "127.0.0.1:8080");
        assert_eq!(config.store.backend, Backend::Redb);
        assert_eq!(config.http.rate_limit, 100);
        assert!(config.http.cors_origins.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9000

            [store]
            backend = "file"
            "#,
        )
        .expect("parse");

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.store.backend, Backend::File);
        assert_eq!(config.store.path, PathBuf::from("filtergraph.db"));
        assert_eq!(config.http, HttpConfig::default());
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = AppConfig::from_toml_str("[server]\nhots = \"0.0.0.0\"\n");
        assert!(matches!(result, Err(FilterError::SerializationError(_))));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            (ENV_CORS_ORIGINS, "*"),
            (ENV_RATE_LIMIT, "0"),
        ]
        .into();
        let mut config = AppConfig::default();
        config.apply_env_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.http.cors_origins.as_deref(), Some("*"));
        assert_eq!(config.http.rate_limit, 0);
    }

    #[test]
    fn bad_rate_limit_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides_from(|key| (key == ENV_RATE_LIMIT).then(|| "fast".to_string()));
        assert_eq!(config.http.rate_limit, 100);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("filtergraph.toml");
        std::fs::write(&path, "[http]\nrate_limit = 5\n").expect("write");

        let config = AppConfig::from_file(&path).expect("load");
        assert_eq!(config.http.rate_limit, 5);

        let missing = AppConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(FilterError::IoError(_))));
    }
}
