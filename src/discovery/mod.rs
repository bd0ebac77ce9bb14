//! Discovery pipeline
//!
//! The reusable core behind every service adapter: list raw items page by
//! page, transform them on a bounded worker pool, keep input order, isolate
//! per-item failures where asked to, and report progress as it goes.
//!
//! # Architecture
//!
//! - [`metadata`] - Provenance locators attached to every adapted value
//! - [`value`] - Tracked values and the extract-or-default helpers
//! - [`progress`] - Stage label and item counters for progress display
//! - [`pagination`] - Cursor-following listing fetcher
//! - [`concurrency`] - Ordered fan-out/fan-in adaptation
//! - [`link`] - Cross-referencing between adapted collections
//! - [`context`] - Capabilities injected into adapters
//!
//! # Example
//!
//! ```ignore
//! use gcpscan::discovery::{adapt, fetch_all_json, Capabilities};
//!
//! async fn networks(ctx: &DiscoveryContext, client: &GcpClient) -> anyhow::Result<Vec<String>> {
//!     let url = client.compute_global_url("networks");
//!     let raw = fetch_all_json(client, ctx.tracker(), &url, "items").await?;
//!     adapt(ctx, raw, |item| async move { Ok(item["name"].to_string()) }).await
//! }
//! ```

pub mod concurrency;
pub mod context;
pub mod error;
pub mod link;
pub mod metadata;
pub mod pagination;
pub mod progress;
pub mod value;

pub use concurrency::{adapt, adapt_tolerant, adapt_with_state, RawItem};
pub use context::{Capabilities, CancellationToken, DiscoveryContext, DEFAULT_WORKERS, MAX_WORKERS};
pub use error::DiscoveryError;
pub use link::link;
pub use metadata::{DiscoveryIdentity, LocatorKind, Metadata, MetadataFactory};
pub use pagination::{fetch_all, fetch_all_json, list_json_page, Page};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use value::{extract, extract_time, lookup, required_str, short_name, Extract, Provenance, Tracked};
