//! Paginated Fetcher
//!
//! Follows a listing API's cursor until the last page. Pagination is strictly
//! sequential since each cursor comes from the previous response. A single
//! failed page aborts the whole listing: callers see every item or an error,
//! never a truncated listing. Failed pages are not retried. A server that
//! answers with the cursor it was just given fails the listing.

use super::progress::ProgressTracker;
use crate::gcp::client::GcpClient;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::future::Future;
use url::Url;

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    /// A page with no successor
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Fetch every page, starting without a cursor.
///
/// After each page the tracker's total is set to the cumulative item count so
/// an observer sees discovery progress before adaptation starts.
pub async fn fetch_all<T, F, Fut>(tracker: &ProgressTracker, mut list_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    tracker.reset_counts();

    let mut all_items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = list_page(cursor.clone()).await?;
        all_items.extend(page.items);
        tracker.set_total_items(all_items.len());

        match page.next_cursor {
            Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                bail!("Listing returned page token {:?} twice", next)
            }
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => break,
        }
    }

    Ok(all_items)
}

/// Fetch one page of a GCP listing.
///
/// `items_path` is the dot path of the item array in the response
/// ("items", "accounts", "clusters"). Aggregated responses, where `items` is
/// an object keyed by zone or region, are flattened.
pub async fn list_json_page(
    client: &GcpClient,
    url: &str,
    items_path: &str,
    cursor: Option<String>,
) -> Result<Page<Value>> {
    let mut url = Url::parse(url).with_context(|| format!("Invalid listing URL: {}", url))?;
    if let Some(token) = cursor {
        url.query_pairs_mut().append_pair("pageToken", &token);
    }

    let response = client.get(url.as_str()).await?;

    let items = extract_items(&response, items_path);
    let next_cursor = response
        .get("nextPageToken")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(Page::new(items, next_cursor))
}

/// Fetch every page of a GCP listing
pub async fn fetch_all_json(
    client: &GcpClient,
    tracker: &ProgressTracker,
    url: &str,
    items_path: &str,
) -> Result<Vec<Value>> {
    fetch_all(tracker, |cursor| list_json_page(client, url, items_path, cursor)).await
}

/// Extract items from a response using a dot path
fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    let mut current = response;
    for part in path.split('.') {
        current = match current.get(part) {
            Some(v) => v,
            None => return vec![],
        };
    }

    match current {
        Value::Array(arr) => arr.clone(),
        Value::Object(scopes) => flatten_aggregated(scopes),
        _ => vec![],
    }
}

/// Flatten `{"zones/us-central1-a": {"instances": [...]}, ...}` into one list
fn flatten_aggregated(scopes: &serde_json::Map<String, Value>) -> Vec<Value> {
    let mut all_items = Vec::new();

    for scope in scopes.values() {
        let Some(obj) = scope.as_object() else {
            continue;
        };
        for (key, value) in obj {
            // Scopes without resources only carry a warning
            if key == "warning" {
                continue;
            }
            if let Some(arr) = value.as_array() {
                all_items.extend(arr.iter().cloned());
            }
        }
    }

    all_items
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_fetch_follows_cursor_until_last_page() {
        let tracker = ProgressTracker::new();
        let calls = RefCell::new(Vec::new());

        let items = fetch_all(&tracker, |cursor: Option<String>| {
            calls.borrow_mut().push(cursor.clone());
            async move {
                Ok::<_, anyhow::Error>(match cursor.as_deref() {
                    None => Page::new(vec!["a"], Some("c1".to_string())),
                    Some("c1") => Page::new(vec!["b"], Some("c2".to_string())),
                    Some("c2") => Page::last(vec!["c"]),
                    Some(other) => return Err(anyhow!("unexpected cursor {}", other)),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec!["a", "b", "c"]);
        assert_eq!(
            calls.into_inner(),
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );
        assert_eq!(tracker.snapshot().total_items, 3);
    }

    #[tokio::test]
    async fn test_repeated_cursor_fails_listing() {
        let tracker = ProgressTracker::new();
        let calls = RefCell::new(0);

        let result: Result<Vec<&str>> = fetch_all(&tracker, |_cursor: Option<String>| {
            *calls.borrow_mut() += 1;
            async move { Ok(Page::new(vec!["a"], Some("stuck".to_string()))) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Listing returned page token \"stuck\" twice");
        assert_eq!(calls.into_inner(), 2);
    }

    #[tokio::test]
    async fn test_page_error_discards_partial_listing() {
        let tracker = ProgressTracker::new();

        let result: Result<Vec<&str>> = fetch_all(&tracker, |cursor: Option<String>| async move {
            match cursor {
                None => Ok(Page::new(vec!["a", "b"], Some("c1".to_string()))),
                Some(_) => Err(anyhow!("page 2 failed")),
            }
        })
        .await;

        assert_eq!(result.unwrap_err().to_string(), "page 2 failed");
        // The observer saw the first page before the failure
        assert_eq!(tracker.snapshot().total_items, 2);
    }

    #[tokio::test]
    async fn test_empty_cursor_ends_listing() {
        let tracker = ProgressTracker::new();
        let items = fetch_all(&tracker, |_cursor: Option<String>| async {
            Ok::<_, anyhow::Error>(Page::new(vec![1], Some(String::new())))
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1]);
    }

    #[test]
    fn test_extract_items_by_path() {
        let response = json!({ "accounts": [{ "email": "a" }, { "email": "b" }] });
        assert_eq!(extract_items(&response, "accounts").len(), 2);
        assert!(extract_items(&response, "items").is_empty());
    }

    #[test]
    fn test_extract_items_flattens_aggregated() {
        let response = json!({
            "items": {
                "zones/us-central1-a": { "instances": [{ "name": "a" }] },
                "zones/us-central1-b": { "warning": { "code": "NO_RESULTS_ON_PAGE" } },
                "zones/europe-west1-b": { "instances": [{ "name": "b" }, { "name": "c" }] }
            }
        });
        assert_eq!(extract_items(&response, "items").len(), 3);
    }
}
