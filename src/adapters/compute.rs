//! Compute Engine adapter
//!
//! Instances, networks, subnetworks, firewalls and SSL certificates. All of
//! them are foundational for the rest of the scan, so every kind is adapted
//! in abort-on-error mode. Firewalls and subnetworks are linked into their
//! parent network once everything is adapted.

use super::{discover, ServiceAdapter};
use crate::discovery::{
    adapt, extract, extract_time, link, lookup, required_str, short_name, Capabilities,
    DiscoveryContext, Metadata, MetadataFactory, Tracked,
};
use crate::gcp::client::GcpClient;
use crate::state::compute::{
    AttachedDisk, ComputeState, DiskEncryption, Firewall, FirewallRule, Instance,
    InstanceServiceAccount, MetadataOptions, Network, ShieldedVm, SslCertificate, Subnetwork,
};
use crate::state::ResourceState;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use url::Url;

pub struct ComputeAdapter;

#[async_trait]
impl ServiceAdapter for ComputeAdapter {
    fn name(&self) -> &'static str {
        "compute"
    }

    async fn adapt(
        &self,
        ctx: &DiscoveryContext,
        client: &GcpClient,
        state: &mut ResourceState,
    ) -> Result<()> {
        let compute = Compute {
            ctx,
            client,
            factory: ctx.metadata(self.name()),
        };

        let instances = compute.get_instances().await?;
        ctx.ensure_active()?;
        let networks = compute.get_networks().await?;
        ctx.ensure_active()?;
        let subnetworks = compute.get_subnetworks().await?;
        ctx.ensure_active()?;
        let firewalls = compute.get_firewalls().await?;
        ctx.ensure_active()?;
        let ssl_certificates = compute.get_ssl_certificates().await?;

        let networks = link_firewalls(&networks, &firewalls);
        let networks = link_subnetworks(&networks, &subnetworks);

        state.compute = ComputeState {
            instances,
            networks,
            subnetworks,
            firewalls,
            ssl_certificates,
        };

        Ok(())
    }
}

/// Attach each firewall to the network it applies to
pub fn link_firewalls(networks: &[Network], firewalls: &[Firewall]) -> Vec<Network> {
    link(
        networks,
        firewalls,
        |network: &Network| network_key(&network.self_link),
        |firewall: &Firewall| network_key(&firewall.network),
        |network: &mut Network, firewalls| network.firewalls = firewalls,
    )
}

/// Attach each subnetwork to its parent network
pub fn link_subnetworks(networks: &[Network], subnetworks: &[Subnetwork]) -> Vec<Network> {
    link(
        networks,
        subnetworks,
        |network: &Network| network_key(&network.self_link),
        |subnetwork: &Subnetwork| network_key(&subnetwork.network),
        |network: &mut Network, subnetworks| network.subnetworks = subnetworks,
    )
}

/// Network URLs compared by their project-relative path, so links written
/// against www.googleapis.com and compute.googleapis.com still match
fn network_key(url: &Tracked<String>) -> Option<String> {
    if !url.is_explicit() {
        return None;
    }
    let url = url.value();
    let path = url.split_once("/projects/").map_or(url.as_str(), |(_, p)| p);
    Some(path.to_string())
}

struct Compute<'a> {
    ctx: &'a DiscoveryContext,
    client: &'a GcpClient,
    factory: MetadataFactory,
}

impl Compute<'_> {
    async fn get_instances(&self) -> Result<Vec<Instance>> {
        let mut url = Url::parse(&self.client.compute_zonal_or_aggregated_url("instances"))?;
        url.query_pairs_mut().append_pair("filter", "status = RUNNING");

        let raw = discover(self.ctx, self.client, "instances", url.as_str(), "items").await?;
        adapt(self.ctx, raw, |item| self.adapt_instance(item)).await
    }

    async fn adapt_instance(&self, item: Value) -> Result<Instance> {
        let self_link = required_str(&item, "selfLink", "instance")?;
        let metadata = self.factory.from_identifier(self_link);

        let mut boot_disk = None;
        let mut attached_disks = Vec::new();
        let disks = lookup(&item, "disks").and_then(Value::as_array);
        let adapted = join_all(
            disks
                .into_iter()
                .flatten()
                .map(|disk| self.adapt_attached_disk(disk, &metadata)),
        )
        .await;
        for (is_boot, disk) in adapted {
            if is_boot && boot_disk.is_none() {
                boot_disk = Some(disk);
            } else {
                attached_disks.push(disk);
            }
        }

        let service_accounts = lookup(&item, "serviceAccounts")
            .and_then(Value::as_array)
            .map(|accounts| {
                accounts
                    .iter()
                    .map(|account| InstanceServiceAccount {
                        metadata: metadata.clone(),
                        email: extract(account, "email", &metadata),
                        scopes: extract(account, "scopes", &metadata),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Instance {
            name: extract(&item, "name", &metadata),
            machine_type: Tracked::from_option(
                lookup(&item, "machineType")
                    .and_then(Value::as_str)
                    .map(|s| short_name(s).to_string()),
                &metadata,
            ),
            can_ip_forward: extract(&item, "canIpForward", &metadata),
            has_public_ip: has_public_ip(&item, &metadata),
            shielded_vm: ShieldedVm {
                metadata: metadata.clone(),
                secure_boot_enabled: extract(&item, "shieldedInstanceConfig.enableSecureBoot", &metadata),
                vtpm_enabled: extract(&item, "shieldedInstanceConfig.enableVtpm", &metadata),
                integrity_monitoring_enabled: extract(
                    &item,
                    "shieldedInstanceConfig.enableIntegrityMonitoring",
                    &metadata,
                ),
            },
            metadata_options: MetadataOptions {
                metadata: metadata.clone(),
                block_project_ssh_keys: metadata_flag(&item, "block-project-ssh-keys", &metadata),
                enable_oslogin: metadata_flag(&item, "enable-oslogin", &metadata),
                serial_port_enabled: metadata_flag(&item, "serial-port-enable", &metadata),
            },
            service_accounts,
            boot_disk,
            attached_disks,
            metadata,
        })
    }

    /// Returns whether the disk is the boot disk, and the adapted disk
    async fn adapt_attached_disk(&self, disk: &Value, instance: &Metadata) -> (bool, AttachedDisk) {
        let is_boot = lookup(disk, "boot").and_then(Value::as_bool).unwrap_or(false);
        let source = lookup(disk, "source").and_then(Value::as_str);

        let metadata = match source {
            Some(source) => self.factory.from_identifier(source),
            None => instance.clone(),
        };
        let encryption = self.describe_disk_encryption(source, &metadata).await;

        let adapted = AttachedDisk {
            device_name: extract(disk, "deviceName", &metadata),
            encryption,
            metadata,
        };
        (is_boot, adapted)
    }

    /// Best-effort secondary lookup: a failed describe degrades the
    /// encryption fields to unresolvable instead of failing the instance
    async fn describe_disk_encryption(&self, source: Option<&str>, metadata: &Metadata) -> DiskEncryption {
        let unresolvable = || DiskEncryption {
            metadata: metadata.clone(),
            kms_key_name: Tracked::unresolvable(metadata),
            customer_supplied: Tracked::unresolvable(metadata),
        };

        let Some(url) = source.and_then(|s| self.client.compute_link_url(s)) else {
            tracing::warn!(instance_disk = %metadata, "Attached disk has no usable source link");
            return unresolvable();
        };

        match self.client.get(&url).await {
            Ok(disk) => DiskEncryption {
                metadata: metadata.clone(),
                kms_key_name: extract(&disk, "diskEncryptionKey.kmsKeyName", metadata),
                customer_supplied: Tracked::explicit(
                    lookup(&disk, "diskEncryptionKey.sha256").is_some(),
                    metadata,
                ),
            },
            Err(err) => {
                tracing::warn!(
                    disk = %metadata,
                    error = %format!("{:#}", err),
                    "Failed to describe disk"
                );
                unresolvable()
            }
        }
    }

    async fn get_networks(&self) -> Result<Vec<Network>> {
        let url = self.client.compute_global_url("networks");
        let raw = discover(self.ctx, self.client, "networks", &url, "items").await?;
        adapt(self.ctx, raw, |item| async move { self.adapt_network(&item) }).await
    }

    fn adapt_network(&self, item: &Value) -> Result<Network> {
        let self_link = required_str(item, "selfLink", "network")?;
        let metadata = self.factory.from_identifier(self_link);

        Ok(Network {
            name: extract(item, "name", &metadata),
            self_link: Tracked::explicit(self_link.to_string(), &metadata),
            auto_create_subnetworks: extract(item, "autoCreateSubnetworks", &metadata),
            routing_mode: extract(item, "routingConfig.routingMode", &metadata),
            firewalls: Vec::new(),
            subnetworks: Vec::new(),
            metadata,
        })
    }

    async fn get_subnetworks(&self) -> Result<Vec<Subnetwork>> {
        let url = self.client.compute_regional_or_aggregated_url("subnetworks");
        let raw = discover(self.ctx, self.client, "subnetworks", &url, "items").await?;
        adapt(self.ctx, raw, |item| async move { self.adapt_subnetwork(&item) }).await
    }

    fn adapt_subnetwork(&self, item: &Value) -> Result<Subnetwork> {
        let self_link = required_str(item, "selfLink", "subnetwork")?;
        let metadata = self.factory.from_identifier(self_link);

        // Older subnetworks only carry the legacy flag
        let mut flow_logs_enabled = extract(item, "logConfig.enable", &metadata);
        if !flow_logs_enabled.is_explicit() {
            flow_logs_enabled = extract(item, "enableFlowLogs", &metadata);
        }

        Ok(Subnetwork {
            name: extract(item, "name", &metadata),
            network: extract(item, "network", &metadata),
            region: Tracked::from_option(
                lookup(item, "region")
                    .and_then(Value::as_str)
                    .map(|s| short_name(s).to_string()),
                &metadata,
            ),
            ip_cidr_range: extract(item, "ipCidrRange", &metadata),
            private_ip_google_access: extract(item, "privateIpGoogleAccess", &metadata),
            flow_logs_enabled,
            metadata,
        })
    }

    async fn get_firewalls(&self) -> Result<Vec<Firewall>> {
        let url = self.client.compute_global_url("firewalls");
        let raw = discover(self.ctx, self.client, "firewalls", &url, "items").await?;
        adapt(self.ctx, raw, |item| async move { self.adapt_firewall(&item) }).await
    }

    fn adapt_firewall(&self, item: &Value) -> Result<Firewall> {
        let self_link = required_str(item, "selfLink", "firewall")?;
        let metadata = self.factory.from_identifier(self_link);

        Ok(Firewall {
            name: extract(item, "name", &metadata),
            network: extract(item, "network", &metadata),
            direction: extract(item, "direction", &metadata),
            disabled: extract(item, "disabled", &metadata),
            priority: extract(item, "priority", &metadata),
            source_ranges: extract(item, "sourceRanges", &metadata),
            destination_ranges: extract(item, "destinationRanges", &metadata),
            allowed: firewall_rules(item, "allowed", &metadata),
            denied: firewall_rules(item, "denied", &metadata),
            logging_enabled: extract(item, "logConfig.enable", &metadata),
            metadata,
        })
    }

    async fn get_ssl_certificates(&self) -> Result<Vec<SslCertificate>> {
        let url = self.client.compute_global_url("sslCertificates");
        let raw = discover(self.ctx, self.client, "SSL certificates", &url, "items").await?;
        adapt(self.ctx, raw, |item| async move { self.adapt_ssl_certificate(&item) }).await
    }

    fn adapt_ssl_certificate(&self, item: &Value) -> Result<SslCertificate> {
        let self_link = required_str(item, "selfLink", "SSL certificate")?;
        let metadata = self.factory.from_identifier(self_link);

        Ok(SslCertificate {
            name: extract(item, "name", &metadata),
            certificate_type: extract(item, "type", &metadata),
            expire_time: extract_time(item, "expireTime", &metadata),
            managed_domains: extract(item, "managed.domains", &metadata),
            metadata,
        })
    }
}

fn firewall_rules(item: &Value, path: &str, metadata: &Metadata) -> Vec<FirewallRule> {
    lookup(item, path)
        .and_then(Value::as_array)
        .map(|rules| {
            rules
                .iter()
                .map(|rule| FirewallRule {
                    metadata: metadata.clone(),
                    protocol: extract(rule, "IPProtocol", metadata),
                    ports: extract(rule, "ports", metadata),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Any network interface with an access config has an external address
fn has_public_ip(item: &Value, metadata: &Metadata) -> Tracked<bool> {
    let Some(interfaces) = lookup(item, "networkInterfaces").and_then(Value::as_array) else {
        return Tracked::defaulted(false, metadata);
    };

    let public = interfaces.iter().any(|interface| {
        lookup(interface, "accessConfigs")
            .and_then(Value::as_array)
            .is_some_and(|configs| !configs.is_empty())
    });
    Tracked::explicit(public, metadata)
}

/// Boolean instance metadata key ("TRUE", "true", "1" are all set)
fn metadata_flag(item: &Value, key: &str, metadata: &Metadata) -> Tracked<bool> {
    let value = lookup(item, "metadata.items")
        .and_then(Value::as_array)
        .and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.get("key").and_then(Value::as_str) == Some(key))
        })
        .and_then(|entry| entry.get("value").and_then(Value::as_str))
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"));

    Tracked::from_option(value, metadata)
}
