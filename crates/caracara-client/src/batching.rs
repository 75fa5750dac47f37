//! Concurrent batch retrieval
//!
//! Entity endpoints accept a bounded number of IDs per request. These helpers
//! split large ID lists into batches and issue the requests concurrently.

use std::collections::BTreeMap;
use std::future::Future;

use futures::{StreamExt, TryStreamExt, stream};
use serde_json::Value;
use tracing::{debug, info};

use crate::constants::{DATA_BATCH_SIZE, pull_concurrency};
use crate::error::{CaracaraError, Result};
use crate::model::{FalconResponse, Record};

/// Fields used to key batch results, in order of preference
const IDENTIFIER_FIELDS: &[&str] = &["id", "device_id", "uuid", "child_cid"];

/// Find the identifier of a resource
pub fn resource_identifier(record: &Record) -> Option<String> {
    IDENTIFIER_FIELDS
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

/// Call `fetch` once per value concurrently and concatenate the resources in
/// value order
pub async fn parallel_list_execution<V, T, F, Fut>(values: Vec<V>, fetch: F) -> Result<Vec<T>>
where
    F: Fn(V) -> Fut,
    Fut: Future<Output = Result<FalconResponse<Vec<T>>>>,
{
    let responses: Vec<FalconResponse<Vec<T>>> = stream::iter(values)
        .map(&fetch)
        .buffered(pull_concurrency())
        .try_collect()
        .await?;

    Ok(responses.into_iter().flat_map(|r| r.resources).collect())
}

/// Fetch entities for a list of IDs in batches of [`DATA_BATCH_SIZE`].
///
/// Results are keyed by each resource's identifier.
pub async fn batch_get_data<F, Fut>(ids: &[String], fetch: F) -> Result<BTreeMap<String, Record>>
where
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = Result<FalconResponse<Vec<Record>>>>,
{
    if ids.is_empty() {
        return Ok(BTreeMap::new());
    }

    let batches: Vec<Vec<String>> = ids.chunks(DATA_BATCH_SIZE).map(<[String]>::to_vec).collect();
    debug!(
        "Fetching data for {} IDs in {} batches",
        ids.len(),
        batches.len()
    );

    let records = parallel_list_execution(batches, fetch).await?;

    let mut data = BTreeMap::new();
    for record in records {
        let identifier = resource_identifier(&record).ok_or_else(|| {
            CaracaraError::InvalidArgument(format!(
                "resource has none of the identifier fields {}",
                IDENTIFIER_FIELDS.join(", ")
            ))
        })?;
        data.insert(identifier, record);
    }

    info!("Retrieved data for {} resources", data.len());
    Ok(data)
}
