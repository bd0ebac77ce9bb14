//! Cloud Storage domain objects

use crate::discovery::{Metadata, Tracked};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageState {
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub metadata: Metadata,
    pub name: Tracked<String>,
    pub location: Tracked<String>,
    pub storage_class: Tracked<String>,
    pub uniform_bucket_level_access: Tracked<bool>,
    pub public_access_prevention: Tracked<String>,
    pub versioning_enabled: Tracked<bool>,
    pub logging_bucket: Tracked<String>,
    pub default_kms_key_name: Tracked<String>,
    /// Granted to allUsers or allAuthenticatedUsers by the bucket IAM policy
    pub public: Tracked<bool>,
}
