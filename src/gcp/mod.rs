//! GCP API interaction module
//!
//! This module provides the read-only plumbing used by discovery: authentication,
//! the HTTP client and URL construction for each Google API.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - Main GCP client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use gcpscan::gcp::client::GcpClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new("my-project", "us-central1-a", Duration::from_secs(60)).await?;
//!     let networks = client.get(&client.compute_global_url("networks")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
