//! # Server Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `suplementor.toml` (only when `--config` names one)
//! 3. `SUPLEMENTOR_*` environment variables
//! 4. CLI flags
//!
//! ## Environment Variables
//!
//! - `SUPLEMENTOR_DATABASE`: Path to the redb content database
//! - `SUPLEMENTOR_HOST` / `SUPLEMENTOR_PORT`: Bind address
//! - `SUPLEMENTOR_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `SUPLEMENTOR_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*"
//! - `SUPLEMENTOR_LOG_FORMAT`: `text` (default) or `json`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use suplementor_core::SuplementorError;
use suplementor_core::validation::Validator;

/// Maximum size of a configuration file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Default requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// LOG FORMAT
// =============================================================================

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

// =============================================================================
// SERVER CONFIG
// =============================================================================

/// Resolved settings for the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub database: PathBuf,
    pub host: String,
    pub port: u16,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// `None` means localhost only.
    pub cors_origins: Option<String>,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("suplementor.db"),
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit: DEFAULT_RATE_LIMIT,
            cors_origins: None,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, SuplementorError> {
        toml::from_str(text)
            .map_err(|e| SuplementorError::SerializationError(format!("Invalid config: {e}")))
    }

    /// Read the config file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, SuplementorError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            SuplementorError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(SuplementorError::SerializationError(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            SuplementorError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Apply `SUPLEMENTOR_*` overrides from the process environment.
    pub fn with_process_env(self) -> Result<Self, SuplementorError> {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Apply `SUPLEMENTOR_*` overrides read through `lookup`.
    ///
    /// Blank values are ignored. Every unparsable value is reported.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SuplementorError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut v = Validator::new();

        if let Some(database) = get("SUPLEMENTOR_DATABASE") {
            self.database = PathBuf::from(database.trim());
        }
        if let Some(host) = get("SUPLEMENTOR_HOST") {
            self.host = host.trim().to_string();
        }
        if let Some(port) = get("SUPLEMENTOR_PORT") {
            match port.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => v.push("SUPLEMENTOR_PORT", format!("'{port}' is not a valid port")),
            }
        }
        if let Some(limit) = get("SUPLEMENTOR_RATE_LIMIT") {
            match limit.trim().parse() {
                Ok(limit) => self.rate_limit = limit,
                Err(_) => v.push(
                    "SUPLEMENTOR_RATE_LIMIT",
                    format!("'{limit}' is not a non-negative integer"),
                ),
            }
        }
        if let Some(origins) = get("SUPLEMENTOR_CORS_ORIGINS") {
            self.cors_origins = Some(origins);
        }
        if let Some(format) = get("SUPLEMENTOR_LOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.log_format = format,
                Err(e) => v.push("SUPLEMENTOR_LOG_FORMAT", e),
            }
        }

        v.finish(self).map_err(Into::into)
    }

    /// Apply explicit CLI flags.
    #[must_use]
    pub fn with_overrides(
        mut self,
        database: Option<PathBuf>,
        host: Option<String>,
        port: Option<u16>,
    ) -> Self {
        if let Some(database) = database {
            self.database = database;
        }
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================
