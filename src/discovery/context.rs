//! Discovery context
//!
//! The ambient capabilities handed to every service adapter and to the
//! concurrent adapter: metadata creation, progress tracking, cooperative
//! cancellation and the worker pool size.

use super::error::DiscoveryError;
use super::metadata::{DiscoveryIdentity, MetadataFactory};
use super::progress::ProgressTracker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default adaptation worker pool size
pub const DEFAULT_WORKERS: usize = 10;

/// Upper bound on the worker pool, to avoid hammering the remote API
pub const MAX_WORKERS: usize = 64;

/// A cooperative cancellation token.
///
/// Workers check the token before claiming the next item; a transform that
/// has already started runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Capabilities shared by service adapters and the concurrent adapter
pub trait Capabilities: Send + Sync {
    /// Metadata factory scoped to one service
    fn metadata(&self, service: &str) -> MetadataFactory;

    fn tracker(&self) -> &ProgressTracker;

    fn cancellation(&self) -> &CancellationToken;

    /// Size of the adaptation worker pool
    fn workers(&self) -> usize;
}

/// Concrete context for one discovery run
#[derive(Debug, Clone)]
pub struct DiscoveryContext {
    identity: Arc<DiscoveryIdentity>,
    tracker: Arc<ProgressTracker>,
    cancellation: CancellationToken,
    workers: usize,
}

impl DiscoveryContext {
    pub fn new(identity: DiscoveryIdentity, workers: usize) -> Self {
        Self {
            identity: Arc::new(identity),
            tracker: Arc::new(ProgressTracker::new()),
            cancellation: CancellationToken::new(),
            workers: workers.clamp(1, MAX_WORKERS),
        }
    }

    /// Share an externally observed tracker
    pub fn with_tracker(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Share an externally owned cancellation token
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn identity(&self) -> &DiscoveryIdentity {
        &self.identity
    }

    pub fn shared_tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    /// Fail with [`DiscoveryError::Cancelled`] once the run was cancelled
    pub fn ensure_active(&self) -> Result<(), DiscoveryError> {
        if self.cancellation.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }
        Ok(())
    }
}

impl Capabilities for DiscoveryContext {
    fn metadata(&self, service: &str) -> MetadataFactory {
        MetadataFactory::new(service, Arc::clone(&self.identity))
    }

    fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    fn workers(&self) -> usize {
        self.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(workers: usize) -> DiscoveryContext {
        DiscoveryContext::new(DiscoveryIdentity::new("gcp", "my-project", "global"), workers)
    }

    #[test]
    fn test_workers_are_clamped() {
        assert_eq!(context(0).workers(), 1);
        assert_eq!(context(1000).workers(), MAX_WORKERS);
        assert_eq!(context(4).workers(), 4);
    }

    #[test]
    fn test_cloned_token_shares_state() {
        let token = CancellationToken::new();
        let ctx = context(2).with_cancellation(token.clone());
        assert!(ctx.ensure_active().is_ok());
        token.cancel();
        assert!(matches!(ctx.ensure_active(), Err(DiscoveryError::Cancelled)));
    }

    #[test]
    fn test_metadata_scoped_to_service() {
        let factory = context(2).metadata("storage");
        assert_eq!(factory.service(), "storage");
        assert_eq!(
            factory.create("buckets/logs").reference(),
            "//storage.googleapis.com/projects/my-project/buckets/logs"
        );
    }
}
