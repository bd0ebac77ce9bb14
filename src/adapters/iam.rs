//! IAM adapter
//!
//! Service accounts, their user-managed keys and the running instances that
//! act as them. Runs after the compute adapter and reads its output; an
//! account whose keys cannot be listed is still reported, with its key
//! collection marked unresolvable.

use super::{discover, ServiceAdapter};
use crate::discovery::{
    adapt_with_state, extract, extract_time, list_json_page, required_str, short_name,
    Capabilities, DiscoveryContext, Metadata, MetadataFactory, Tracked,
};
use crate::gcp::client::GcpClient;
use crate::state::compute::ComputeState;
use crate::state::iam::{IamState, ServiceAccount, ServiceAccountKey};
use crate::state::ResourceState;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub struct IamAdapter;

#[async_trait]
impl ServiceAdapter for IamAdapter {
    fn name(&self) -> &'static str {
        "iam"
    }

    async fn adapt(
        &self,
        ctx: &DiscoveryContext,
        client: &GcpClient,
        state: &mut ResourceState,
    ) -> Result<()> {
        let factory = ctx.metadata(self.name());

        let url = client.iam_service_accounts_url();
        let raw = discover(ctx, client, "service accounts", &url, "accounts").await?;
        let service_accounts = adapt_with_state(ctx, raw, &state.compute, |item, compute| {
            adapt_service_account(client, &factory, compute, item)
        })
        .await;

        // Tolerant adaptation swallows cancellation; surface it here
        ctx.ensure_active()?;

        state.iam = IamState { service_accounts };
        Ok(())
    }
}

async fn adapt_service_account(
    client: &GcpClient,
    factory: &MetadataFactory,
    compute: &ComputeState,
    item: Value,
) -> Result<ServiceAccount> {
    let email = required_str(&item, "email", "service account")?;
    let name = required_str(&item, "name", "service account")?;
    let metadata = factory.create(&format!("serviceAccounts/{}", email));

    let keys = list_user_managed_keys(client, factory, &metadata, name, email).await;
    let attached_instances = compute
        .instances_using_service_account(email)
        .into_iter()
        .cloned()
        .collect();

    Ok(ServiceAccount {
        email: Tracked::explicit(email.to_string(), &metadata),
        display_name: extract(&item, "displayName", &metadata),
        disabled: extract(&item, "disabled", &metadata),
        keys,
        attached_instances,
        metadata,
    })
}

async fn list_user_managed_keys(
    client: &GcpClient,
    factory: &MetadataFactory,
    account: &Metadata,
    account_name: &str,
    email: &str,
) -> Tracked<Vec<ServiceAccountKey>> {
    let url = client.iam_url(&format!("{}/keys?keyTypes=USER_MANAGED", account_name));

    match list_json_page(client, &url, "keys", None).await {
        Ok(page) => {
            let keys = page
                .items
                .iter()
                .map(|key| {
                    let id = key
                        .get("name")
                        .and_then(Value::as_str)
                        .map(short_name)
                        .unwrap_or("unknown");
                    let metadata = factory.create(&format!("serviceAccounts/{}/keys/{}", email, id));
                    adapt_key(key, metadata)
                })
                .collect();
            Tracked::explicit(keys, account)
        }
        Err(err) => {
            tracing::error!(
                service_account = %email,
                error = %format!("{:#}", err),
                "Failed to list service account keys"
            );
            Tracked::unresolvable(account)
        }
    }
}

fn adapt_key(key: &Value, metadata: Metadata) -> ServiceAccountKey {
    ServiceAccountKey {
        key_type: extract(key, "keyType", &metadata),
        valid_after: extract_time(key, "validAfterTime", &metadata),
        valid_before: extract_time(key, "validBeforeTime", &metadata),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing;
    use crate::discovery::Provenance;
    use serde_json::json;

    #[test]
    fn test_key_adaptation() {
        let factory = testing::context().metadata("iam");
        let metadata = factory.create("serviceAccounts/sa@test-project.iam.gserviceaccount.com/keys/abc");
        let key = adapt_key(
            &json!({
                "name": "projects/test-project/serviceAccounts/sa@test-project.iam.gserviceaccount.com/keys/abc",
                "keyType": "USER_MANAGED",
                "validAfterTime": "2024-01-01T00:00:00Z",
                "validBeforeTime": "9999-12-31T23:59:59Z"
            }),
            metadata,
        );

        assert_eq!(key.key_type.value(), "USER_MANAGED");
        assert!(key.valid_after.is_explicit());
        assert_eq!(key.valid_before.value().to_rfc3339(), "9999-12-31T23:59:59+00:00");
    }

    #[tokio::test]
    async fn test_failed_key_listing_keeps_account() {
        let ctx = testing::context();
        let client = testing::client("http://127.0.0.1:9");
        let factory = ctx.metadata("iam");

        let account = adapt_service_account(
            &client,
            &factory,
            &ComputeState::default(),
            json!({
                "name": "projects/test-project/serviceAccounts/sa@test-project.iam.gserviceaccount.com",
                "email": "sa@test-project.iam.gserviceaccount.com"
            }),
        )
        .await
        .unwrap();

        assert_eq!(account.keys.provenance(), Provenance::Unresolvable);
        assert!(account.keys.value().is_empty());
        assert!(account.attached_instances.is_empty());
        assert_eq!(account.disabled.provenance(), Provenance::DefaultedMissing);
        assert_eq!(
            account.metadata.reference(),
            "//iam.googleapis.com/projects/test-project/serviceAccounts/sa@test-project.iam.gserviceaccount.com"
        );
    }

    #[tokio::test]
    async fn test_account_without_email_fails() {
        let ctx = testing::context();
        let client = testing::client("http://127.0.0.1:9");
        let factory = ctx.metadata("iam");

        let err = adapt_service_account(&client, &factory, &ComputeState::default(), json!({ "name": "x" }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "service account email not specified");
    }
}
