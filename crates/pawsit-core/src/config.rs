//! TOML-based engine configuration.
//!
//! Holds the timing constants of the availability engine and where the
//! backend lives:
//! - Debounce delay before a burst of calendar edits is saved
//! - How long the "saved" and error notices stay visible
//! - Backend base URL and request timeout
//!
//! Every field has a serde default so a partial (or missing) file is valid.
//! `PAWSIT_API_URL` overrides the backend URL.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable overriding `backend.base_url`.
pub const API_URL_ENV: &str = "PAWSIT_API_URL";

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Root of the REST API; availability lives under `users/{id}/availability/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Availability engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quiet period after the last edit before a save is issued.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How long the success notice stays up.
    #[serde(default = "default_saved_display_ms")]
    pub saved_display_ms: u64,
    /// How long an error notice stays up.
    #[serde(default = "default_error_display_ms")]
    pub error_display_ms: u64,
    #[serde(default)]
    pub backend: BackendConfig,
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:8000/api".into()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_debounce_ms() -> u64 {
    2000
}
fn default_saved_display_ms() -> u64 {
    2000
}
fn default_error_display_ms() -> u64 {
    5000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            saved_display_ms: default_saved_display_ms(),
            error_display_ms: default_error_display_ms(),
            backend: BackendConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn parsed_base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl EngineConfig {
    /// `~/.config/pawsit/availability.toml` (platform config dir).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pawsit")
            .join("availability.toml")
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path`, falling back to defaults when the file does not
    /// exist, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the resulting configuration is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut cfg = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup (environment in production).
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV) {
            self.backend.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "debounce_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if let Err(e) = self.backend.parsed_base_url() {
            return Err(ConfigError::InvalidValue {
                key: "backend.base_url".into(),
                message: e.to_string(),
            });
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn saved_display(&self) -> Duration {
        Duration::from_millis(self.saved_display_ms)
    }

    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }
}
