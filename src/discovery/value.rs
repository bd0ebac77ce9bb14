//! Tracked values
//!
//! Every leaf field of the state tree is a [`Tracked`] value: the value, the
//! metadata of its owning resource, and whether it was read from the API,
//! substituted because the API omitted it, or could not be determined.

use super::error::DiscoveryError;
use super::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Read from the source API
    Explicit,
    /// Absent in the source; the type's zero value was substituted
    DefaultedMissing,
    /// Could not be determined, not even as a default
    Unresolvable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracked<T> {
    value: T,
    metadata: Metadata,
    provenance: Provenance,
}

impl<T> Tracked<T> {
    pub fn explicit(value: T, metadata: &Metadata) -> Self {
        Self {
            value,
            metadata: metadata.clone(),
            provenance: Provenance::Explicit,
        }
    }

    pub fn defaulted(value: T, metadata: &Metadata) -> Self {
        Self {
            value,
            metadata: metadata.clone(),
            provenance: Provenance::DefaultedMissing,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_explicit(&self) -> bool {
        self.provenance == Provenance::Explicit
    }

    pub fn is_resolvable(&self) -> bool {
        self.provenance != Provenance::Unresolvable
    }

    /// Equality against a plain value; unresolvable values never match
    pub fn equal_to(&self, other: &T) -> bool
    where
        T: PartialEq,
    {
        self.is_resolvable() && self.value == *other
    }
}

impl<T: Default> Tracked<T> {
    pub fn unresolvable(metadata: &Metadata) -> Self {
        Self {
            value: T::default(),
            metadata: metadata.clone(),
            provenance: Provenance::Unresolvable,
        }
    }

    /// Explicit when present, otherwise the zero value tagged as defaulted
    pub fn from_option(value: Option<T>, metadata: &Metadata) -> Self {
        match value {
            Some(value) => Self::explicit(value, metadata),
            None => Self::defaulted(T::default(), metadata),
        }
    }
}

/// Scalar types that can be read out of a raw JSON item
pub trait Extract: Sized + Default {
    fn extract(value: &Value) -> Option<Self>;
}

impl Extract for String {
    fn extract(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl Extract for bool {
    fn extract(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

// GCP encodes int64 fields as JSON strings
impl Extract for i64 {
    fn extract(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl Extract for Vec<String> {
    fn extract(value: &Value) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

/// Walk a dot-notation path ("shieldedInstanceConfig.enableSecureBoot",
/// "disks.0.source"). JSON null counts as absent.
pub fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = item;
    for part in path.split('.') {
        current = match part.parse::<usize>() {
            Ok(idx) => current.get(idx)?,
            Err(_) => current.get(part)?,
        };
    }
    (!current.is_null()).then_some(current)
}

/// Extract-or-default: explicit when present, zero value tagged
/// `DefaultedMissing` when absent, `Unresolvable` when present with the wrong
/// shape.
pub fn extract<T: Extract>(item: &Value, path: &str, metadata: &Metadata) -> Tracked<T> {
    match lookup(item, path) {
        None => Tracked::defaulted(T::default(), metadata),
        Some(raw) => match T::extract(raw) {
            Some(value) => Tracked::explicit(value, metadata),
            None => Tracked::unresolvable(metadata),
        },
    }
}

/// RFC 3339 timestamp; there is no meaningful zero time, so absence is
/// `Unresolvable` rather than defaulted.
pub fn extract_time(item: &Value, path: &str, metadata: &Metadata) -> Tracked<DateTime<Utc>> {
    lookup(item, path)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| Tracked::explicit(t.with_timezone(&Utc), metadata))
        .unwrap_or_else(|| Tracked::unresolvable(metadata))
}

/// A string field the adapter cannot work without
pub fn required_str<'a>(
    item: &'a Value,
    path: &'static str,
    kind: &'static str,
) -> Result<&'a str, DiscoveryError> {
    lookup(item, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DiscoveryError::missing(kind, path))
}

/// Last segment of a GCP resource URL
/// e.g., "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a" -> "us-central1-a"
pub fn short_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
