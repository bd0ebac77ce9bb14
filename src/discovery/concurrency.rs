//! Concurrent Adapter
//!
//! Runs a per-item transform over a bounded pool of workers and returns the
//! results in input order, whatever order they complete in.
//!
//! Two failure modes:
//!
//! - [`adapt`]: the first error stops the batch. Workers stop claiming items,
//!   transforms already in flight finish, then the error is returned and every
//!   completed result is discarded.
//! - [`adapt_tolerant`] / [`adapt_with_state`]: each failure is logged with the
//!   item's source identifier and the item is left out of the result.
//!
//! Either way the tracker's completed count moves once per processed item.

use super::context::{Capabilities, CancellationToken};
use super::error::DiscoveryError;
use anyhow::Result;
use futures::future::join_all;
use serde_json::Value;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An item from a listing API, identifiable for failure logs
pub trait RawItem {
    fn source_id(&self) -> String;
}

impl RawItem for Value {
    fn source_id(&self) -> String {
        ["selfLink", "name", "email", "id"]
            .iter()
            .find_map(|key| self.get(*key).and_then(|v| v.as_str()))
            .unwrap_or("<unknown>")
            .to_string()
    }
}

impl RawItem for String {
    fn source_id(&self) -> String {
        self.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailurePolicy {
    Abort,
    Skip,
}

struct Dispatched<T> {
    slots: Vec<Option<T>>,
    first_error: Option<anyhow::Error>,
    /// Items were left unclaimed because of cancellation
    interrupted: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Adapt every item, aborting on the first error
pub async fn adapt<C, I, T, F, Fut>(caps: &C, items: Vec<I>, transform: F) -> Result<Vec<T>>
where
    C: Capabilities + ?Sized,
    I: RawItem,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let dispatched = dispatch(caps, items, &transform, FailurePolicy::Abort).await;

    if let Some(err) = dispatched.first_error {
        return Err(err);
    }
    if dispatched.interrupted {
        return Err(DiscoveryError::Cancelled.into());
    }

    Ok(dispatched.slots.into_iter().flatten().collect())
}

/// Adapt every item, logging and skipping the ones that fail
pub async fn adapt_tolerant<C, I, T, F, Fut>(caps: &C, items: Vec<I>, transform: F) -> Vec<T>
where
    C: Capabilities + ?Sized,
    I: RawItem,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = items.len();
    let dispatched = dispatch(caps, items, &transform, FailurePolicy::Skip).await;

    let adapted: Vec<T> = dispatched.slots.into_iter().flatten().collect();
    if dispatched.interrupted {
        tracing::warn!("Adaptation cancelled with items pending");
    }
    if adapted.len() < total {
        tracing::warn!("Adapted {} of {} resources", adapted.len(), total);
    }

    adapted
}

/// Tolerant adaptation with a read-only view of already discovered state
/// passed to every transform
pub async fn adapt_with_state<'s, C, S, I, T, F, Fut>(
    caps: &C,
    items: Vec<I>,
    state: &'s S,
    transform: F,
) -> Vec<T>
where
    C: Capabilities + ?Sized,
    S: ?Sized,
    I: RawItem,
    F: Fn(I, &'s S) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    adapt_tolerant(caps, items, |item| transform(item, state)).await
}

async fn dispatch<C, I, T, F, Fut>(
    caps: &C,
    items: Vec<I>,
    transform: &F,
    policy: FailurePolicy,
) -> Dispatched<T>
where
    C: Capabilities + ?Sized,
    I: RawItem,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = items.len();
    let pool_size = caps.workers().clamp(1, total.max(1));

    // Items are indexed at dispatch; results land in the slot of that index
    let queue = Mutex::new(items.into_iter().enumerate());
    let first_error: Mutex<Option<anyhow::Error>> = Mutex::new(None);
    let stop = CancellationToken::new();

    let (queue_ref, first_error_ref, stop_ref) = (&queue, &first_error, &stop);
    let workers = (0..pool_size).map(move |_| async move {
        let mut completed = Vec::new();

        loop {
            if stop_ref.is_cancelled() || caps.cancellation().is_cancelled() {
                break;
            }
            let next = lock(queue_ref).next();
            let Some((index, item)) = next else {
                break;
            };

            let source = item.source_id();
            match transform(item).await {
                Ok(value) => completed.push((index, value)),
                Err(err) => match policy {
                    FailurePolicy::Abort => {
                        stop_ref.cancel();
                        let mut first = lock(first_error_ref);
                        if first.is_none() {
                            *first = Some(err);
                        }
                    }
                    FailurePolicy::Skip => {
                        tracing::error!(
                            resource = %source,
                            error = %format!("{:#}", err),
                            "Failed to adapt resource"
                        );
                    }
                },
            }
            caps.tracker().increment_completed();
        }

        completed
    });

    let finished = join_all(workers).await;

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
    for (index, value) in finished.into_iter().flatten() {
        slots[index] = Some(value);
    }

    let interrupted = lock(&queue).len() > 0;
    let first_error = first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);

    Dispatched {
        slots,
        first_error,
        interrupted,
    }
}
