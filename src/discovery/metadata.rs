//! Metadata Factory
//!
//! Every adapted resource and every tracked field carries a [`Metadata`]
//! locator recording where in the source project it came from.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Stable identity of the scanned scope, shared by all metadata of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryIdentity {
    pub provider: String,
    pub project: String,
    pub location: String,
}

impl DiscoveryIdentity {
    pub fn new(provider: &str, project: &str, location: &str) -> Self {
        Self {
            provider: provider.to_string(),
            project: project.to_string(),
            location: location.to_string(),
        }
    }
}

/// How a locator was built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    /// Hierarchical path below the project, e.g. "instances/web-1"
    Path,
    /// Globally unique identifier (a GCP `selfLink`) taken verbatim
    Resource,
}

/// Immutable provenance locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    reference: String,
    kind: LocatorKind,
    identity: Arc<DiscoveryIdentity>,
}

impl Metadata {
    /// Canonical reference of the located resource
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn kind(&self) -> LocatorKind {
        self.kind
    }

    pub fn identity(&self) -> &DiscoveryIdentity {
        &self.identity
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Metadata", 5)?;
        state.serialize_field("reference", &self.reference)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("provider", &self.identity.provider)?;
        state.serialize_field("project", &self.identity.project)?;
        state.serialize_field("location", &self.identity.location)?;
        state.end()
    }
}

/// Builds metadata for one service within a discovery run
#[derive(Debug, Clone)]
pub struct MetadataFactory {
    service: String,
    identity: Arc<DiscoveryIdentity>,
}

impl MetadataFactory {
    pub fn new(service: &str, identity: Arc<DiscoveryIdentity>) -> Self {
        Self {
            service: service.to_string(),
            identity,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Metadata from a path relative to the project
    pub fn create(&self, path: &str) -> Metadata {
        let path = path.trim_start_matches('/');
        Metadata {
            reference: format!(
                "//{}.googleapis.com/projects/{}/{}",
                self.service, self.identity.project, path
            ),
            kind: LocatorKind::Path,
            identity: Arc::clone(&self.identity),
        }
    }

    /// Metadata from a globally unique identifier. Malformed identifiers are
    /// kept as-is.
    pub fn from_identifier(&self, id: &str) -> Metadata {
        Metadata {
            reference: id.to_string(),
            kind: LocatorKind::Resource,
            identity: Arc::clone(&self.identity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> MetadataFactory {
        MetadataFactory::new(
            "compute",
            Arc::new(DiscoveryIdentity::new("gcp", "my-project", "us-central1-a")),
        )
    }

    #[test]
    fn test_create_builds_canonical_reference() {
        let metadata = factory().create("/instances/web-1");
        assert_eq!(
            metadata.reference(),
            "//compute.googleapis.com/projects/my-project/instances/web-1"
        );
        assert_eq!(metadata.kind(), LocatorKind::Path);
        assert_eq!(metadata.identity().location, "us-central1-a");
    }

    #[test]
    fn test_identifier_kept_verbatim_even_if_malformed() {
        let metadata = factory().from_identifier("not a link");
        assert_eq!(metadata.reference(), "not a link");
        assert_eq!(metadata.kind(), LocatorKind::Resource);
    }

    #[test]
    fn test_serializes_identity() {
        let json = serde_json::to_value(factory().create("networks/default")).unwrap();
        assert_eq!(json["project"], "my-project");
        assert_eq!(json["provider"], "gcp");
        assert_eq!(json["kind"], "path");
    }
}
