//! Runtime configuration: an optional `config.yaml` in the data directory,
//! with a couple of environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CarnetError, Result};
use crate::sync::{Connectivity, DEFAULT_LOCAL_KEY, DEFAULT_STORE_NAME};

pub const CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_DATA_DIR: &str = ".carnet";

pub mod env_vars {
    pub const DATA_DIR: &str = "CARNET_DIR";
    pub const LOG: &str = "CARNET_LOG";
    pub const PORT: &str = "PORT";
}

mod defaults {
    use super::*;

    pub fn local_key() -> String {
        DEFAULT_LOCAL_KEY.to_string()
    }
    pub fn local_capacity_bytes() -> usize {
        5 * 1024 * 1024
    }
    pub fn database() -> String {
        "NotesApp".to_string()
    }
    pub fn store_name() -> String {
        DEFAULT_STORE_NAME.to_string()
    }
    pub fn reminder_interval_secs() -> u64 {
        60
    }
    pub fn share_base_url() -> String {
        crate::share::DEFAULT_BASE_URL.to_string()
    }
    pub fn port() -> u16 {
        3000
    }
    pub fn server_database() -> String {
        "server.db".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "defaults::port")]
    pub port: u16,
    /// SQLite file backing the REST API, relative to the data directory.
    #[serde(default = "defaults::server_database")]
    pub database: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            database: defaults::server_database(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarnetConfig {
    #[serde(default = "defaults::local_key")]
    pub local_key: String,
    #[serde(default = "defaults::local_capacity_bytes")]
    pub local_capacity_bytes: usize,
    #[serde(default = "defaults::database")]
    pub database: String,
    #[serde(default = "defaults::store_name")]
    pub store_name: String,
    #[serde(default = "defaults::reminder_interval_secs")]
    pub reminder_interval_secs: u64,
    #[serde(default)]
    pub connectivity: Connectivity,
    #[serde(default = "defaults::share_base_url")]
    pub share_base_url: String,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for CarnetConfig {
    fn default() -> Self {
        Self {
            local_key: defaults::local_key(),
            local_capacity_bytes: defaults::local_capacity_bytes(),
            database: defaults::database(),
            store_name: defaults::store_name(),
            reminder_interval_secs: defaults::reminder_interval_secs(),
            connectivity: Connectivity::default(),
            share_base_url: defaults::share_base_url(),
            api: ApiConfig::default(),
        }
    }
}

impl CarnetConfig {
    /// Read `config.yaml` from `data_dir` (defaults when absent), then apply
    /// environment overrides.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::from_file(&data_dir.join(CONFIG_FILE))?;
        config.apply_port_override(env::var(env_vars::PORT).ok().as_deref())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<()> {
        if let Some(raw) = port {
            self.api.port = raw
                .trim()
                .parse()
                .map_err(|_| CarnetError::Config(format!("{} is not a valid port: {}", env_vars::PORT, raw)))?;
        }
        Ok(())
    }

    pub fn reminder_period(&self) -> Duration {
        Duration::from_secs(self.reminder_interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.reminder_interval_secs == 0 {
            return Err(CarnetError::Config(
                "reminder_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.local_key.is_empty() || self.store_name.is_empty() || self.database.is_empty() {
            return Err(CarnetError::Config(
                "local_key, store_name and database must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// `--data-dir`, else `$CARNET_DIR`, else `./.carnet`.
pub fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var_os(env_vars::DATA_DIR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let tmp = TempDir::new().unwrap();
        let config = CarnetConfig::from_file(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, CarnetConfig::default());
        assert_eq!(config.local_key, "userNotes");
        assert_eq!(config.database, "NotesApp");
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.reminder_period(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "connectivity: offline\napi:\n  port: 8080\n").unwrap();

        let config = CarnetConfig::from_file(&path).unwrap();

        assert_eq!(config.connectivity, Connectivity::Offline);
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.database, "server.db");
        assert_eq!(config.store_name, "notes");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "reminder_interval_secs: 0\n").unwrap();
        assert!(matches!(
            CarnetConfig::from_file(&path),
            Err(CarnetError::Config(_))
        ));
    }

    #[test]
    fn test_port_override() {
        let mut config = CarnetConfig::default();
        config.apply_port_override(Some("4100")).unwrap();
        assert_eq!(config.api.port, 4100);
        assert!(config.apply_port_override(Some("http")).is_err());
        config.apply_port_override(None).unwrap();
        assert_eq!(config.api.port, 4100);
    }

    #[test]
    fn test_flag_wins_for_data_dir() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/carnet-notes")));
        assert_eq!(dir, PathBuf::from("/tmp/carnet-notes"));
    }
}
