//! Discovery error types
//!
//! Conditions the pipeline itself raises. They travel inside `anyhow::Error`
//! so callers can `downcast_ref::<DiscoveryError>()` without losing the chain.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A field the adapter cannot work without was absent from the raw item
    #[error("{kind} {field} not specified")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    /// The discovery context was cancelled before the batch completed
    #[error("discovery cancelled")]
    Cancelled,

    /// A service name that no registered adapter answers to
    #[error("unknown service adapter: {0}")]
    UnknownService(String),

    /// Non-success HTTP status from a GCP API
    #[error("API request failed: {status} ({url})")]
    Api { status: u16, url: String },
}

impl DiscoveryError {
    pub fn missing(kind: &'static str, field: &'static str) -> Self {
        Self::MissingField { kind, field }
    }

    /// HTTP status carried by an `anyhow::Error`, if it wraps an API failure
    pub fn status_of(error: &anyhow::Error) -> Option<u16> {
        error.chain().find_map(|cause| match cause.downcast_ref::<DiscoveryError>() {
            Some(DiscoveryError::Api { status, .. }) => Some(*status),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn missing_field_message_names_kind_and_field() {
        let err = DiscoveryError::missing("service account", "email");
        assert_eq!(err.to_string(), "service account email not specified");
    }

    #[test]
    fn status_survives_context_layers() {
        let err: anyhow::Result<()> = Err(DiscoveryError::Api {
            status: 403,
            url: "https://example.test".to_string(),
        }
        .into());
        let err = err.context("Failed to list instances").unwrap_err();
        assert_eq!(DiscoveryError::status_of(&err), Some(403));
    }
}
