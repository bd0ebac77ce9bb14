//! Cloud Storage adapter
//!
//! Buckets are adapted in tolerant mode: one unreadable bucket is logged and
//! left out, the rest of the scan carries on.

use super::{discover, ServiceAdapter};
use crate::discovery::{
    adapt_tolerant, extract, lookup, required_str, Capabilities, DiscoveryContext, Metadata,
    MetadataFactory, Tracked,
};
use crate::gcp::client::GcpClient;
use crate::state::storage::{Bucket, StorageState};
use crate::state::ResourceState;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// IAM members that make a bucket readable outside the organization
const PUBLIC_MEMBERS: &[&str] = &["allUsers", "allAuthenticatedUsers"];

pub struct StorageAdapter;

#[async_trait]
impl ServiceAdapter for StorageAdapter {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn adapt(
        &self,
        ctx: &DiscoveryContext,
        client: &GcpClient,
        state: &mut ResourceState,
    ) -> Result<()> {
        let factory = ctx.metadata(self.name());

        let url = client.storage_buckets_url();
        let raw = discover(ctx, client, "buckets", &url, "items").await?;
        let buckets = adapt_tolerant(ctx, raw, |item| adapt_bucket(client, &factory, item)).await;
        // A cancelled tolerant batch is partial
        ctx.ensure_active()?;

        state.storage = StorageState { buckets };
        Ok(())
    }
}

async fn adapt_bucket(client: &GcpClient, factory: &MetadataFactory, item: Value) -> Result<Bucket> {
    let name = required_str(&item, "name", "bucket")?;
    let metadata = factory.create(&format!("buckets/{}", name));
    let public = bucket_is_public(client, name, &metadata).await;

    Ok(Bucket {
        name: Tracked::explicit(name.to_string(), &metadata),
        location: extract(&item, "location", &metadata),
        storage_class: extract(&item, "storageClass", &metadata),
        uniform_bucket_level_access: extract(
            &item,
            "iamConfiguration.uniformBucketLevelAccess.enabled",
            &metadata,
        ),
        public_access_prevention: extract(&item, "iamConfiguration.publicAccessPrevention", &metadata),
        versioning_enabled: extract(&item, "versioning.enabled", &metadata),
        logging_bucket: extract(&item, "logging.logBucket", &metadata),
        default_kms_key_name: extract(&item, "encryption.defaultKmsKeyName", &metadata),
        public,
        metadata,
    })
}

/// Secondary lookup of the bucket IAM policy. A policy we are not allowed to
/// read leaves the flag unresolvable rather than failing the bucket.
async fn bucket_is_public(client: &GcpClient, bucket: &str, metadata: &Metadata) -> Tracked<bool> {
    match client.get(&client.storage_bucket_iam_url(bucket)).await {
        Ok(policy) => Tracked::explicit(policy_is_public(&policy), metadata),
        Err(err) => {
            tracing::warn!(
                bucket = %bucket,
                error = %format!("{:#}", err),
                "Failed to read bucket IAM policy"
            );
            Tracked::unresolvable(metadata)
        }
    }
}

fn policy_is_public(policy: &Value) -> bool {
    lookup(policy, "bindings")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|binding| lookup(binding, "members").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .any(|member| PUBLIC_MEMBERS.contains(&member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing;
    use crate::discovery::Provenance;
    use serde_json::json;

    #[test]
    fn test_policy_is_public() {
        let private = json!({ "bindings": [
            { "role": "roles/storage.objectViewer", "members": ["user:a@example.com"] }
        ]});
        let public = json!({ "bindings": [
            { "role": "roles/storage.admin", "members": ["group:ops@example.com"] },
            { "role": "roles/storage.objectViewer", "members": ["allUsers"] }
        ]});

        assert!(!policy_is_public(&private));
        assert!(policy_is_public(&public));
        assert!(!policy_is_public(&json!({})));
    }

    #[tokio::test]
    async fn test_bucket_without_name_fails() {
        let ctx = testing::context();
        let client = testing::client("http://127.0.0.1:9");
        let factory = ctx.metadata("storage");

        let err = adapt_bucket(&client, &factory, json!({ "location": "US" }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bucket name not specified");
    }

    #[tokio::test]
    async fn test_unreadable_policy_is_unresolvable() {
        let ctx = testing::context();
        let client = testing::client("http://127.0.0.1:9");
        let factory = ctx.metadata("storage");

        let bucket = adapt_bucket(
            &client,
            &factory,
            json!({
                "name": "logs",
                "location": "US",
                "iamConfiguration": { "uniformBucketLevelAccess": { "enabled": true } }
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            bucket.metadata.reference(),
            "//storage.googleapis.com/projects/test-project/buckets/logs"
        );
        assert!(*bucket.uniform_bucket_level_access.value());
        assert_eq!(bucket.versioning_enabled.provenance(), Provenance::DefaultedMissing);
        assert_eq!(bucket.public.provenance(), Provenance::Unresolvable);
    }
}
