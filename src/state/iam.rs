//! IAM domain objects

use crate::discovery::{Metadata, Tracked};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IamState {
    pub service_accounts: Vec<ServiceAccount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceAccount {
    pub metadata: Metadata,
    pub email: Tracked<String>,
    pub display_name: Tracked<String>,
    pub disabled: Tracked<bool>,
    /// User-managed keys; unresolvable when the key listing failed
    pub keys: Tracked<Vec<ServiceAccountKey>>,
    /// Running instances that act as this account
    pub attached_instances: Vec<Tracked<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceAccountKey {
    pub metadata: Metadata,
    pub key_type: Tracked<String>,
    pub valid_after: Tracked<DateTime<Utc>>,
    pub valid_before: Tracked<DateTime<Utc>>,
}
