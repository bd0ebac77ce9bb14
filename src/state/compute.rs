//! Compute Engine domain objects

use crate::discovery::{Metadata, Tracked};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ComputeState {
    pub instances: Vec<Instance>,
    pub networks: Vec<Network>,
    pub subnetworks: Vec<Subnetwork>,
    pub firewalls: Vec<Firewall>,
    pub ssl_certificates: Vec<SslCertificate>,
}

impl ComputeState {
    /// Names of instances running as the given service account
    pub fn instances_using_service_account(&self, email: &str) -> Vec<&Tracked<String>> {
        self.instances
            .iter()
            .filter(|instance| {
                instance
                    .service_accounts
                    .iter()
                    .any(|account| account.email.equal_to(&email.to_string()))
            })
            .map(|instance| &instance.name)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    pub metadata: Metadata,
    pub name: Tracked<String>,
    pub machine_type: Tracked<String>,
    pub can_ip_forward: Tracked<bool>,
    pub has_public_ip: Tracked<bool>,
    pub shielded_vm: ShieldedVm,
    pub metadata_options: MetadataOptions,
    pub service_accounts: Vec<InstanceServiceAccount>,
    pub boot_disk: Option<AttachedDisk>,
    pub attached_disks: Vec<AttachedDisk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShieldedVm {
    pub metadata: Metadata,
    pub secure_boot_enabled: Tracked<bool>,
    pub vtpm_enabled: Tracked<bool>,
    pub integrity_monitoring_enabled: Tracked<bool>,
}

/// Security-relevant keys of the instance metadata server
#[derive(Debug, Clone, Serialize)]
pub struct MetadataOptions {
    pub metadata: Metadata,
    pub block_project_ssh_keys: Tracked<bool>,
    pub enable_oslogin: Tracked<bool>,
    pub serial_port_enabled: Tracked<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceServiceAccount {
    pub metadata: Metadata,
    pub email: Tracked<String>,
    pub scopes: Tracked<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachedDisk {
    pub metadata: Metadata,
    pub device_name: Tracked<String>,
    pub encryption: DiskEncryption,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskEncryption {
    pub metadata: Metadata,
    /// Customer-managed key, empty for Google-managed encryption
    pub kms_key_name: Tracked<String>,
    /// Encrypted with a customer-supplied raw key
    pub customer_supplied: Tracked<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Network {
    pub metadata: Metadata,
    pub name: Tracked<String>,
    pub self_link: Tracked<String>,
    pub auto_create_subnetworks: Tracked<bool>,
    pub routing_mode: Tracked<String>,
    pub firewalls: Vec<Firewall>,
    pub subnetworks: Vec<Subnetwork>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subnetwork {
    pub metadata: Metadata,
    pub name: Tracked<String>,
    pub network: Tracked<String>,
    pub region: Tracked<String>,
    pub ip_cidr_range: Tracked<String>,
    pub private_ip_google_access: Tracked<bool>,
    pub flow_logs_enabled: Tracked<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Firewall {
    pub metadata: Metadata,
    pub name: Tracked<String>,
    pub network: Tracked<String>,
    pub direction: Tracked<String>,
    pub disabled: Tracked<bool>,
    pub priority: Tracked<i64>,
    pub source_ranges: Tracked<Vec<String>>,
    pub destination_ranges: Tracked<Vec<String>>,
    pub allowed: Vec<FirewallRule>,
    pub denied: Vec<FirewallRule>,
    pub logging_enabled: Tracked<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FirewallRule {
    pub metadata: Metadata,
    pub protocol: Tracked<String>,
    pub ports: Tracked<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SslCertificate {
    pub metadata: Metadata,
    pub name: Tracked<String>,
    pub certificate_type: Tracked<String>,
    pub expire_time: Tracked<DateTime<Utc>>,
    pub managed_domains: Tracked<Vec<String>>,
}
