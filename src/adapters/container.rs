//! GKE adapter

use super::{discover, ServiceAdapter};
use crate::discovery::{
    adapt, extract, lookup, required_str, Capabilities, DiscoveryContext, MetadataFactory, Tracked,
};
use crate::gcp::client::GcpClient;
use crate::state::gke::{Cluster, GkeState};
use crate::state::ResourceState;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub struct ContainerAdapter;

#[async_trait]
impl ServiceAdapter for ContainerAdapter {
    fn name(&self) -> &'static str {
        "container"
    }

    async fn adapt(
        &self,
        ctx: &DiscoveryContext,
        client: &GcpClient,
        state: &mut ResourceState,
    ) -> Result<()> {
        let factory = ctx.metadata(self.name());

        // "-" lists clusters in every location of the project
        let url = client.container_location_url("-", "clusters");
        let raw = discover(ctx, client, "GKE clusters", &url, "clusters").await?;
        let clusters = adapt(ctx, raw, |item| {
            let factory = &factory;
            async move { adapt_cluster(factory, &item) }
        })
        .await?;

        state.gke = GkeState { clusters };
        Ok(())
    }
}

fn adapt_cluster(factory: &MetadataFactory, item: &Value) -> Result<Cluster> {
    let name = required_str(item, "name", "cluster")?;
    let location = required_str(item, "location", "cluster")?;
    let metadata = factory.create(&format!("locations/{}/clusters/{}", location, name));

    // Network policy is on only when the addon is not disabled as well
    let network_policy_enabled: Tracked<bool> = extract(item, "networkPolicy.enabled", &metadata);
    let addon_disabled = lookup(item, "addonsConfig.networkPolicyConfig.disabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let network_policy_enabled = if addon_disabled && network_policy_enabled.is_explicit() {
        Tracked::explicit(false, &metadata)
    } else {
        network_policy_enabled
    };

    Ok(Cluster {
        name: Tracked::explicit(name.to_string(), &metadata),
        location: Tracked::explicit(location.to_string(), &metadata),
        master_version: extract(item, "currentMasterVersion", &metadata),
        network: extract(item, "network", &metadata),
        legacy_abac_enabled: extract(item, "legacyAbac.enabled", &metadata),
        network_policy_enabled,
        private_nodes: extract(item, "privateClusterConfig.enablePrivateNodes", &metadata),
        private_endpoint: extract(item, "privateClusterConfig.enablePrivateEndpoint", &metadata),
        master_authorized_networks_enabled: extract(
            item,
            "masterAuthorizedNetworksConfig.enabled",
            &metadata,
        ),
        shielded_nodes_enabled: extract(item, "shieldedNodes.enabled", &metadata),
        logging_service: extract(item, "loggingService", &metadata),
        monitoring_service: extract(item, "monitoringService", &metadata),
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing;
    use crate::discovery::Provenance;
    use serde_json::json;

    #[test]
    fn test_cluster_adaptation() {
        let factory = testing::context().metadata("container");
        let cluster = adapt_cluster(
            &factory,
            &json!({
                "name": "prod",
                "location": "us-central1",
                "currentMasterVersion": "1.29.4-gke.100",
                "legacyAbac": {},
                "networkPolicy": { "enabled": true },
                "addonsConfig": { "networkPolicyConfig": { "disabled": true } },
                "privateClusterConfig": { "enablePrivateNodes": true }
            }),
        )
        .unwrap();

        assert_eq!(
            cluster.metadata.reference(),
            "//container.googleapis.com/projects/test-project/locations/us-central1/clusters/prod"
        );
        assert_eq!(cluster.master_version.value(), "1.29.4-gke.100");
        assert_eq!(cluster.legacy_abac_enabled.provenance(), Provenance::DefaultedMissing);
        assert!(!cluster.network_policy_enabled.value());
        assert!(*cluster.private_nodes.value());
        assert!(!cluster.private_endpoint.value());
    }

    #[test]
    fn test_cluster_without_location_fails() {
        let factory = testing::context().metadata("container");
        let err = adapt_cluster(&factory, &json!({ "name": "prod" })).unwrap_err();
        assert_eq!(err.to_string(), "cluster location not specified");
    }
}
