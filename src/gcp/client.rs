//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality. Shared read-only by every discovery worker.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

/// Zone value that selects the aggregated (all zones) listing APIs
pub const ALL_ZONES: &str = "all";

/// API roots, overridable for emulators and mock servers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub compute: String,
    pub storage: String,
    pub container: String,
    pub iam: String,
}

impl Endpoints {
    /// Public Google API endpoints
    pub fn google() -> Self {
        Self {
            compute: "https://compute.googleapis.com".to_string(),
            storage: "https://storage.googleapis.com".to_string(),
            container: "https://container.googleapis.com".to_string(),
            iam: "https://iam.googleapis.com".to_string(),
        }
    }

    /// Route every API through a single base URL
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            compute: base.clone(),
            storage: base.clone(),
            container: base.clone(),
            iam: base,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::google()
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    pub zone: String,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new(project_id: &str, zone: &str, timeout: Duration) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        let http = GcpHttpClient::with_timeout(timeout)?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            zone: zone.to_string(),
            endpoints: Endpoints::google(),
        })
    }

    /// Create a client from explicit parts
    pub fn with_parts(
        credentials: GcpCredentials,
        http: GcpHttpClient,
        project_id: &str,
        zone: &str,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            zone: zone.to_string(),
            endpoints,
        }
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        self.http.get(url, &token).await
    }

    /// True when listing across every zone of the project
    pub fn is_all_zones(&self) -> bool {
        self.zone == ALL_ZONES
    }

    /// Get the region from the current zone
    pub fn get_region(&self) -> String {
        let parts: Vec<&str> = self.zone.rsplitn(2, '-').collect();
        if parts.len() == 2 {
            parts[1].to_string()
        } else {
            self.zone.clone()
        }
    }

    /// Location label used for metadata
    pub fn location(&self) -> String {
        if self.is_all_zones() {
            "global".to_string()
        } else {
            self.zone.clone()
        }
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, path: &str) -> String {
        format!(
            "{}/compute/v1/projects/{}/{}",
            self.endpoints.compute, self.project_id, path
        )
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, resource: &str) -> String {
        self.compute_url(&format!("zones/{}/{}", self.zone, resource))
    }

    /// Build regional Compute Engine API URL
    pub fn compute_regional_url(&self, resource: &str) -> String {
        self.compute_url(&format!("regions/{}/{}", self.get_region(), resource))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, resource: &str) -> String {
        self.compute_url(&format!("global/{}", resource))
    }

    /// Build aggregated Compute Engine API URL (all zones)
    pub fn compute_aggregated_url(&self, resource: &str) -> String {
        self.compute_url(&format!("aggregated/{}", resource))
    }

    /// Zonal listing URL, or the aggregated one when scanning all zones
    pub fn compute_zonal_or_aggregated_url(&self, resource: &str) -> String {
        if self.is_all_zones() {
            self.compute_aggregated_url(resource)
        } else {
            self.compute_zonal_url(resource)
        }
    }

    /// Regional listing URL, or the aggregated one when scanning all zones
    pub fn compute_regional_or_aggregated_url(&self, resource: &str) -> String {
        if self.is_all_zones() {
            self.compute_aggregated_url(resource)
        } else {
            self.compute_regional_url(resource)
        }
    }

    /// Rebase a Compute Engine `selfLink` onto the configured endpoint
    ///
    /// e.g. "https://www.googleapis.com/compute/v1/projects/p/zones/z/disks/d"
    /// becomes "{compute}/compute/v1/projects/p/zones/z/disks/d"
    pub fn compute_link_url(&self, link: &str) -> Option<String> {
        let (_, path) = link.split_once("/compute/v1/")?;
        Some(format!("{}/compute/v1/{}", self.endpoints.compute, path))
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.endpoints.storage, path)
    }

    /// Build Cloud Storage bucket listing URL for the current project
    pub fn storage_buckets_url(&self) -> String {
        self.storage_url(&format!(
            "b?project={}",
            urlencoding::encode(&self.project_id)
        ))
    }

    /// Build Cloud Storage bucket IAM policy URL
    pub fn storage_bucket_iam_url(&self, bucket: &str) -> String {
        self.storage_url(&format!("b/{}/iam", urlencoding::encode(bucket)))
    }

    // =========================================================================
    // GKE API helpers
    // =========================================================================

    /// Build GKE API URL
    pub fn container_url(&self, path: &str) -> String {
        format!(
            "{}/v1/projects/{}/{}",
            self.endpoints.container, self.project_id, path
        )
    }

    /// Build GKE location URL (region, zone or "-" for all)
    pub fn container_location_url(&self, location: &str, resource: &str) -> String {
        self.container_url(&format!("locations/{}/{}", location, resource))
    }

    // =========================================================================
    // IAM API helpers
    // =========================================================================

    /// Build IAM API URL from a resource name ("projects/p/serviceAccounts/...")
    pub fn iam_url(&self, name: &str) -> String {
        format!("{}/v1/{}", self.endpoints.iam, name)
    }

    /// Build IAM service account listing URL for the current project
    pub fn iam_service_accounts_url(&self) -> String {
        self.iam_url(&format!("projects/{}/serviceAccounts", self.project_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(zone: &str) -> GcpClient {
        GcpClient::with_parts(
            GcpCredentials::from_token("t"),
            GcpHttpClient::new().unwrap(),
            "my-project",
            zone,
            Endpoints::google(),
        )
    }

    #[test]
    fn test_region_from_zone() {
        assert_eq!(client("us-central1-a").get_region(), "us-central1");
        assert_eq!(client("europe-west4-b").get_region(), "europe-west4");
    }

    #[test]
    fn test_all_zones_uses_aggregated_urls() {
        let c = client(ALL_ZONES);
        assert_eq!(
            c.compute_zonal_or_aggregated_url("instances"),
            "https://compute.googleapis.com/compute/v1/projects/my-project/aggregated/instances"
        );
        assert_eq!(c.location(), "global");
    }

    #[test]
    fn test_compute_link_is_rebased() {
        let mut c = client("us-central1-a");
        c.endpoints = Endpoints::with_base("http://127.0.0.1:9000/");
        let url = c
            .compute_link_url("https://www.googleapis.com/compute/v1/projects/my-project/zones/us-central1-a/disks/boot")
            .unwrap();
        assert_eq!(
            url,
            "http://127.0.0.1:9000/compute/v1/projects/my-project/zones/us-central1-a/disks/boot"
        );
        assert!(c.compute_link_url("not-a-link").is_none());
    }

    #[test]
    fn test_storage_urls_are_encoded() {
        let c = client("us-central1-a");
        assert_eq!(
            c.storage_bucket_iam_url("logs/bucket"),
            "https://storage.googleapis.com/storage/v1/b/logs%2Fbucket/iam"
        );
        assert_eq!(
            c.storage_buckets_url(),
            "https://storage.googleapis.com/storage/v1/b?project=my-project"
        );
    }
}
