//! Service configuration module.
//!
//! Handles loading, validating, and merging the `exif-query.toml` file. The
//! file is optional: stock defaults are overridden by whatever keys the file
//! sets, and command-line flags override the file.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! bind = "0.0.0.0"             # Listen address
//! port = 8000                  # Listen port
//! max_upload_bytes = 10485760  # Request body limit (uploads included)
//! cors_origins = []            # Allowed origins; empty allows any origin
//!
//! [store]
//! base_url = "https://picsum.photos"  # Remote bucket every identifier resolves against
//! timeout_ms = 5000                   # Per-request upstream timeout
//! images = ["id/237/200/300"]         # Catalog returned by /list-images
//! # index_path = "index.json"         # Remote JSON array that replaces `images`
//! credentials_path = "credentials.txt"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [store]
//! base_url = "http://127.0.0.1:9000/photos"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `exif-query.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listener and request limits.
    pub server: ServerConfig,
    /// Remote image bucket settings.
    pub store: StoreConfig,
}

/// Longest upstream timeout accepted by [`ServiceConfig::validate`].
const MAX_TIMEOUT_MS: u64 = 60_000;

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be non-zero".into(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_upload_bytes must be non-zero".into(),
            ));
        }
        if let Some(origin) = self
            .server
            .cors_origins
            .iter()
            .find(|o| axum::http::HeaderValue::from_str(o).is_err())
        {
            return Err(ConfigError::Validation(format!(
                "server.cors_origins contains an invalid origin: {origin:?}"
            )));
        }
        if self.store.timeout_ms == 0 || self.store.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Validation(format!(
                "store.timeout_ms must be 1-{MAX_TIMEOUT_MS}"
            )));
        }
        let url = reqwest::Url::parse(&self.store.base_url).map_err(|e| {
            ConfigError::Validation(format!("store.base_url is not a valid URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::Validation(
                "store.base_url must be an absolute http(s) URL".into(),
            ));
        }
        if self.store.credentials_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store.credentials_path must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Socket address string the server binds to, e.g. `0.0.0.0:8000`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

/// Listener and request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Maximum request body size in bytes. Uploads count against it.
    pub max_upload_bytes: usize,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

/// Remote image bucket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Base URL every image identifier is resolved against.
    pub base_url: String,
    /// Upstream request timeout in milliseconds. No retries are attempted.
    pub timeout_ms: u64,
    /// Image identifiers returned by `/list-images`.
    pub images: Vec<String>,
    /// Remote JSON document (array of identifiers) that replaces `images`.
    pub index_path: Option<String>,
    /// Remote document holding `username:password` lines for `/login`.
    pub credentials_path: String,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://picsum.photos".to_string(),
            timeout_ms: 5000,
            images: vec![
                "id/237/200/300".to_string(),
                "id/1025/400/300".to_string(),
                "id/1074/400/400".to_string(),
            ],
            index_path: None,
            credentials_path: "credentials.txt".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ServiceConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `exif-query.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# exif-query Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags (serve --port, --bind, --base-url) override this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# HTTP listener
# ---------------------------------------------------------------------------
[server]
# Address and port to listen on.
bind = "0.0.0.0"
port = 8000

# Maximum request body size in bytes. Uploaded images count against it.
max_upload_bytes = 10485760

# Origins allowed by CORS. An empty list allows any origin.
cors_origins = []

# ---------------------------------------------------------------------------
# Remote image bucket
# ---------------------------------------------------------------------------
[store]
# Every image identifier is appended to this URL as path segments.
base_url = "https://picsum.photos"

# Upstream request timeout in milliseconds (1-60000). Failed fetches are not retried.
timeout_ms = 5000

# Identifiers returned by /list-images.
images = ["id/237/200/300", "id/1025/400/300", "id/1074/400/400"]

# Remote JSON array of identifiers. When set, it replaces `images`.
# index_path = "index.json"

# Remote document holding `username:password` lines, checked by /login.
credentials_path = "credentials.txt"
"##
}
