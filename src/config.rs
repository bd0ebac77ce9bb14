//! Configuration Management
//!
//! Handles persistent configuration storage for gcpscan. Command line flags
//! win over the config file, which wins over the gcloud defaults.

use crate::discovery::{DEFAULT_WORKERS, MAX_WORKERS};
use crate::gcp::http::DEFAULT_REQUEST_TIMEOUT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Zone used when neither the config nor gcloud names one
const FALLBACK_ZONE: &str = "us-central1-a";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Project to scan
    #[serde(default)]
    pub project_id: Option<String>,
    /// Zone to scan, or "all" for every zone
    #[serde(default)]
    pub zone: Option<String>,
    /// Worker pool size per adaptation batch
    #[serde(default)]
    pub workers: Option<usize>,
    /// Services to scan, in any order; empty scans everything
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Single base URL for every API (emulators, mock servers)
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcpscan").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load configuration from a file; a missing or unreadable file yields
    /// the defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, err);
                Self::default()
            }),
            Err(err) => {
                tracing::warn!("Failed to read config {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {:?}", path))?;

        Ok(())
    }

    /// Get effective project (CLI > config > gcloud default)
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.project_id.clone())
            .or_else(crate::gcp::auth::get_default_project)
            .filter(|p| !p.is_empty())
    }

    /// Get effective zone (CLI > config > gcloud default)
    pub fn effective_zone(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.zone.clone())
            .or_else(crate::gcp::auth::get_default_zone)
            .unwrap_or_else(|| FALLBACK_ZONE.to_string())
    }

    /// Get effective worker count (CLI > config > default), clamped
    pub fn effective_workers(&self, cli: Option<usize>) -> usize {
        cli.or(self.workers)
            .unwrap_or(DEFAULT_WORKERS)
            .clamp(1, MAX_WORKERS)
    }

    /// Get effective service selection (CLI > config)
    pub fn effective_services(&self, cli: &[String]) -> Vec<String> {
        if cli.is_empty() {
            self.services.clone()
        } else {
            cli.to_vec()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_wins_over_config() {
        let config = Config {
            project_id: Some("from-config".to_string()),
            zone: Some("europe-west1-b".to_string()),
            workers: Some(4),
            services: vec!["iam".to_string()],
            ..Default::default()
        };

        assert_eq!(config.effective_project(Some("from-cli")).as_deref(), Some("from-cli"));
        assert_eq!(config.effective_project(None).as_deref(), Some("from-config"));
        assert_eq!(config.effective_zone(Some("all")), "all");
        assert_eq!(config.effective_zone(None), "europe-west1-b");
        assert_eq!(config.effective_workers(Some(16)), 16);
        assert_eq!(config.effective_workers(None), 4);
        assert_eq!(config.effective_services(&[]), vec!["iam"]);
        assert_eq!(config.effective_services(&["compute".to_string()]), vec!["compute"]);
    }

    #[test]
    fn test_workers_are_clamped() {
        let config = Config::default();
        assert_eq!(config.effective_workers(None), DEFAULT_WORKERS);
        assert_eq!(config.effective_workers(Some(0)), 1);
        assert_eq!(config.effective_workers(Some(1000)), MAX_WORKERS);
    }

    #[test]
    fn test_request_timeout() {
        let mut config = Config::default();
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        config.request_timeout_secs = Some(5);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        config.request_timeout_secs = Some(0);
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("gcpscan-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");

        let config = Config {
            project_id: Some("my-project".to_string()),
            zone: Some("all".to_string()),
            workers: Some(12),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_or_malformed_file_gives_defaults() {
        let dir = std::env::temp_dir().join(format!("gcpscan-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");
        assert_eq!(Config::load_from(&path), Config::default());

        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let config: Config = serde_json::from_str(r#"{ "project_id": "p" }"#).unwrap();
        assert_eq!(config.project_id.as_deref(), Some("p"));
        assert!(config.services.is_empty());
        assert!(config.api_base_url.is_none());
    }
}
