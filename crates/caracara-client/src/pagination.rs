//! Automatic pagination
//!
//! Falcon endpoints page their results in one of two ways: a numeric offset
//! (any page can be requested at once, so pages are pulled concurrently once
//! the total is known) or a scroll token (each page names the next, so pages
//! are pulled in order).

use std::future::Future;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info, warn};

use crate::constants::pull_concurrency;
use crate::error::Result;
use crate::model::FalconResponse;

/// Pull every page of a numeric-offset endpoint one after another.
///
/// `fetch` is called with `(offset, limit)`.
pub async fn all_pages_numbered_offset<T, F, Fut>(fetch: F, limit: u64) -> Result<Vec<T>>
where
    F: Fn(u64, u64) -> Fut,
    Fut: Future<Output = Result<FalconResponse<Vec<T>>>>,
{
    let mut results: Vec<T> = Vec::new();
    let mut offset = 0;

    loop {
        debug!("Fetching page at offset {} (limit {})", offset, limit);
        let response = fetch(offset, limit).await?;
        let total = response.total();
        let page = response.resources;

        if page.is_empty() {
            break;
        }

        offset += page.len() as u64;
        results.extend(page);

        if total <= results.len() as u64 {
            break;
        }
    }

    info!("Retrieved {} resources", results.len());
    Ok(results)
}

/// Pull every page of a numeric-offset endpoint concurrently.
///
/// The first page reveals the total; the remaining offsets are fetched with
/// bounded concurrency and concatenated in page order.
pub async fn all_pages_numbered_offset_parallel<T, F, Fut>(fetch: F, limit: u64) -> Result<Vec<T>>
where
    F: Fn(u64, u64) -> Fut,
    Fut: Future<Output = Result<FalconResponse<Vec<T>>>>,
{
    let first = fetch(0, limit).await?;
    let total = first.total();
    let mut results = first.resources;

    if results.is_empty() || limit == 0 {
        return Ok(results);
    }

    let offsets: Vec<u64> = (limit..total).step_by(limit as usize).collect();
    debug!(
        "Total of {} resources; fetching {} more pages",
        total,
        offsets.len()
    );

    let pages: Vec<FalconResponse<Vec<T>>> = stream::iter(offsets)
        .map(|offset| fetch(offset, limit))
        .buffered(pull_concurrency())
        .try_collect()
        .await?;

    for page in pages {
        results.extend(page.resources);
    }

    info!("Retrieved {} resources", results.len());
    Ok(results)
}

/// Pull every page of a scroll-token endpoint.
///
/// `fetch` is called with `(token, limit)`; the first call has no token.
pub async fn all_pages_token_offset<T, F, Fut>(fetch: F, limit: u64) -> Result<Vec<T>>
where
    F: Fn(Option<String>, u64) -> Fut,
    Fut: Future<Output = Result<FalconResponse<Vec<T>>>>,
{
    let mut results: Vec<T> = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let response = fetch(token.take(), limit).await?;
        let total = response.total();
        let next_token = response.next_token();
        let page = response.resources;

        if page.is_empty() {
            if !results.is_empty() {
                warn!(
                    "Received an empty page after {} of {} resources; stopping",
                    results.len(),
                    total
                );
            }
            break;
        }

        results.extend(page);
        debug!("Retrieved {} of {} resources", results.len(), total);

        if total <= results.len() as u64 {
            break;
        }

        match next_token {
            Some(next) => token = Some(next),
            None => {
                warn!("No scroll token returned before all resources were retrieved");
                break;
            }
        }
    }

    info!("Retrieved {} resources", results.len());
    Ok(results)
}
