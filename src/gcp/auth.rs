//! GCP Authentication
//!
//! Handles authentication using Application Default Credentials (ADC) and
//! resolves the default project and location from the gcloud configuration.

use anyhow::{anyhow, Context, Result};
use gcp_auth::TokenProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Read-only scope: discovery never mutates the project
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform.read-only"];

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// GCP credentials holder with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    provider: Option<Arc<dyn TokenProvider>>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    /// Create new GCP credentials using Application Default Credentials
    pub async fn new() -> Result<Self> {
        let provider = gcp_auth::provider().await.context(
            "Failed to initialize GCP authentication. Run 'gcloud auth application-default login'",
        )?;

        Ok(Self {
            provider: Some(provider),
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Credentials backed by a fixed access token.
    ///
    /// Used against emulators and mock servers, or when the caller already
    /// holds a token (e.g. `gcloud auth print-access-token`).
    pub fn from_token(token: impl Into<String>) -> Self {
        let cached = CachedToken {
            token: token.into(),
            expires_at: Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER,
        };

        Self {
            provider: None,
            token_cache: Arc::new(RwLock::new(Some(cached))),
        }
    }

    /// Get an access token for API calls
    /// Security: Checks token expiry before returning cached token
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let Some(provider) = self.provider.as_ref() else {
            return Err(anyhow!("Static access token expired"));
        };

        let token = provider
            .token(DEFAULT_SCOPES)
            .await
            .context("Failed to get access token")?;

        let token_str = token.as_str().to_string();

        // gcp_auth exposes expiry as an Option, so use a conservative TTL
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    // Check CLOUDSDK_CONFIG environment variable first
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    // Default to ~/.config/gcloud on Linux/macOS
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    let mut chars = project.chars();

    // Must start with a letter
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {},
        _ => return false,
    }

    // Must not end with a hyphen
    if project.ends_with('-') {
        return false;
    }

    // All chars must be lowercase, digit, or hyphen
    project.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Environment variables naming the default project, in lookup order
const PROJECT_ENV_VARS: &[&str] = &["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

/// Read the default project from the environment or gcloud configuration
/// Security: Validates project ID format before returning
pub fn get_default_project() -> Option<String> {
    for var in PROJECT_ENV_VARS {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    let config_dir = get_gcloud_config_dir()?;

    // Legacy flat properties file, then the active named configuration
    let legacy = std::fs::read_to_string(config_dir.join("properties"))
        .ok()
        .and_then(|content| ini_value(&content, None, "project"))
        .filter(|project| validate_project_id(project));
    legacy.or_else(|| {
        active_config_value(&config_dir, "core", "project").filter(|project| validate_project_id(project))
    })
}

/// Get the default zone from the environment or gcloud configuration
pub fn get_default_zone() -> Option<String> {
    if let Ok(zone) = std::env::var("CLOUDSDK_COMPUTE_ZONE") {
        return Some(zone);
    }

    let config_dir = get_gcloud_config_dir()?;
    active_config_value(&config_dir, "compute", "zone")
}

/// Read `section.key` from the active gcloud configuration
fn active_config_value(config_dir: &Path, section: &str, key: &str) -> Option<String> {
    let active_config = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let config_name = active_config.trim();

    // Security: Validate config name to prevent path traversal
    if !config_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }

    let config_path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));
    let content = std::fs::read_to_string(config_path).ok()?;
    ini_value(&content, Some(section), key)
}

/// Minimal INI lookup. With no section, any `key = value` line matches.
fn ini_value(content: &str, section: Option<&str>, key: &str) -> Option<String> {
    let mut current: Option<&str> = None;

    for line in content.lines() {
        let line = line.trim();
        // Security: Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = Some(name);
            continue;
        }
        if section.is_some() && current != section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                return Some(v.trim().to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("my-project-123"));
        assert!(!validate_project_id("short"));
        assert!(!validate_project_id("Upper-Case-Project"));
        assert!(!validate_project_id("1starts-with-digit"));
        assert!(!validate_project_id("ends-with-hyphen-"));
    }

    #[test]
    fn test_ini_value_respects_sections() {
        let content = "; comment\n[core]\nproject = my-project-123\naccount = a@example.com\n\n[compute]\nzone = europe-west1-b\n";
        assert_eq!(ini_value(content, Some("core"), "project").as_deref(), Some("my-project-123"));
        assert_eq!(ini_value(content, Some("compute"), "zone").as_deref(), Some("europe-west1-b"));
        assert_eq!(ini_value(content, Some("core"), "zone"), None);
        assert_eq!(ini_value(content, None, "zone").as_deref(), Some("europe-west1-b"));
    }

    #[tokio::test]
    async fn test_static_token_is_returned_from_cache() {
        let credentials = GcpCredentials::from_token("test-token");
        assert_eq!(credentials.get_token().await.unwrap(), "test-token");
    }
}
