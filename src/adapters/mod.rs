//! Service adapters
//!
//! One adapter per GCP service. Each lists its resource kinds, adapts them
//! through the discovery pipeline and writes its own field of the
//! [`ResourceState`]. Adapters are composed explicitly by the
//! [`registry::AdapterRegistry`]; nothing registers itself.
//!
//! - [`compute`] - instances, networks, subnetworks, firewalls, SSL certificates
//! - [`storage`] - Cloud Storage buckets
//! - [`container`] - GKE clusters
//! - [`iam`] - service accounts (reads the compute state for attachments)

pub mod compute;
pub mod container;
pub mod iam;
pub mod registry;
pub mod storage;

use crate::discovery::{fetch_all_json, Capabilities, DiscoveryContext};
use crate::gcp::client::GcpClient;
use crate::state::ResourceState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

pub use compute::ComputeAdapter;
pub use container::ContainerAdapter;
pub use iam::IamAdapter;
pub use registry::{default_adapters, AdapterRegistry};
pub use storage::StorageAdapter;

#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    /// Service name, also the metadata service label ("compute", "iam", ...)
    fn name(&self) -> &'static str;

    fn provider(&self) -> &'static str {
        "gcp"
    }

    /// Discover and adapt this service's resources into `state`
    async fn adapt(
        &self,
        ctx: &DiscoveryContext,
        client: &GcpClient,
        state: &mut ResourceState,
    ) -> Result<()>;
}

/// List every raw item of one resource kind, labelling the progress stages
pub(crate) async fn discover(
    ctx: &DiscoveryContext,
    client: &GcpClient,
    kind: &str,
    url: &str,
    items_path: &str,
) -> Result<Vec<Value>> {
    let tracker = ctx.tracker();
    tracker.set_stage_label(&format!("Discovering {}...", kind));

    let raw = fetch_all_json(client, tracker, url, items_path)
        .await
        .with_context(|| format!("Failed to list {}", kind))?;
    tracing::debug!("Listed {} {}", raw.len(), kind);

    tracker.set_stage_label(&format!("Adapting {}...", kind));
    Ok(raw)
}
