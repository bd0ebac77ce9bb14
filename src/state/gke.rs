//! GKE domain objects

use crate::discovery::{Metadata, Tracked};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct GkeState {
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub metadata: Metadata,
    pub name: Tracked<String>,
    pub location: Tracked<String>,
    pub master_version: Tracked<String>,
    pub network: Tracked<String>,
    pub legacy_abac_enabled: Tracked<bool>,
    pub network_policy_enabled: Tracked<bool>,
    pub private_nodes: Tracked<bool>,
    pub private_endpoint: Tracked<bool>,
    pub master_authorized_networks_enabled: Tracked<bool>,
    pub shielded_nodes_enabled: Tracked<bool>,
    pub logging_service: Tracked<String>,
    pub monitoring_service: Tracked<String>,
}
