//! gcpscan
//!
//! Discovers the resources of a Google Cloud project and adapts them into a
//! typed, provenance-tracked state tree for a policy engine to evaluate.
//!
//! - [`gcp`] - Authentication, HTTP and URL building for the GCP REST APIs
//! - [`discovery`] - Pagination, concurrent adaptation, progress, linking
//! - [`state`] - The adapted resource tree
//! - [`adapters`] - One adapter per GCP service and the registry running them
//! - [`config`] - Persistent configuration
//! - [`ui`] - Progress display

pub mod adapters;
pub mod config;
pub mod discovery;
pub mod gcp;
pub mod state;
pub mod ui;

/// Version injected at compile time via GCPSCAN_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("GCPSCAN_VERSION") {
    Some(v) => v,
    None => "dev",
};
