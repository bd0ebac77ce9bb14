//! Aggregate resource state
//!
//! The tree handed to the policy engine: one field per service, each a
//! collection of adapted resources. Service adapters fill their own field;
//! later adapters may read earlier fields but never write them.

pub mod compute;
pub mod gke;
pub mod iam;
pub mod storage;

use serde::Serialize;

pub use compute::ComputeState;
pub use gke::GkeState;
pub use iam::IamState;
pub use storage::StorageState;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceState {
    pub compute: ComputeState,
    pub storage: StorageState,
    pub gke: GkeState,
    pub iam: IamState,
}

impl ResourceState {
    /// Number of top-level resources across all services
    pub fn resource_count(&self) -> usize {
        self.compute.instances.len()
            + self.compute.networks.len()
            + self.compute.subnetworks.len()
            + self.compute.firewalls.len()
            + self.compute.ssl_certificates.len()
            + self.storage.buckets.len()
            + self.gke.clusters.len()
            + self.iam.service_accounts.len()
    }
}
