//! Runtime configuration, read from a TOML file.
//!
//! ```toml
//! api_base = "http://localhost:8081"
//! storage_dir = "/var/lib/daymare"   # optional
//! session_ttl_days = 7
//! log_filter = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::session::DEFAULT_TTL_DAYS;

pub const DEFAULT_API_BASE: &str = "http://localhost:8081";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Base URL the API paths (`/api/index`, ...) resolve against.
    pub api_base: String,
    /// Directory holding the session slot. Resolved by
    /// [`RuntimeConfig::resolved_storage_dir`] when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
    pub session_ttl_days: i64,
    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            storage_dir: None,
            session_ttl_days: DEFAULT_TTL_DAYS,
            log_filter: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Session storage directory:
    /// 1. `storage_dir` when set
    /// 2. the platform data directory, under `daymare`
    /// 3. `$HOME/.daymare`
    pub fn resolved_storage_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.storage_dir {
            return Ok(dir.clone());
        }
        if let Some(data_dir) = dirs::data_dir() {
            return Ok(data_dir.join("daymare"));
        }
        if let Some(home) = std::env::var_os("HOME") {
            return Ok(PathBuf::from(home).join(".daymare"));
        }
        Err(ConfigError::NoDataDir)
    }
}
