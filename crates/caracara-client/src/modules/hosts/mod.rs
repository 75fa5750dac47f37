//! Hosts and Host Group API
//!
//! Device discovery, containment, hiding, tagging, online state and host
//! group management. The implementation is split across several files, each
//! adding an `impl HostsApiModule` block for one area.

mod containment;
mod data_history;
mod groups;
mod hiding;
mod online_state;
mod tagging;

use std::collections::BTreeMap;
use std::sync::Arc;

use caracara_filters::Fql;
use serde::Serialize;
use tracing::{debug, info};

use crate::batching::batch_get_data;
use crate::constants::{DEVICE_ACTION_BATCH_SIZE, SCROLL_BATCH_SIZE};
use crate::error::Result;
use crate::http::FalconHttpClient;
use crate::model::{FalconResponse, IdsBody, Record};
use crate::pagination::all_pages_token_offset;

pub use groups::UngroupResult;
pub use online_state::OnlineState;

/// Interact with hosts and host groups within a Falcon tenant
pub struct HostsApiModule {
    http: Arc<FalconHttpClient>,
}

impl HostsApiModule {
    pub const NAME: &'static str = "CrowdStrike Hosts API Module";

    pub fn new(http: Arc<FalconHttpClient>) -> Self {
        debug!("Configuring the Hosts and Host Group APIs");
        Self { http }
    }

    // ============== Device Queries ==============

    /// Return the ID of every device matching the filter
    pub async fn get_device_ids(&self, filters: impl Into<Fql>) -> Result<Vec<String>> {
        let fql = filters.into();
        info!("Searching for device IDs using the filter string {}", fql);

        let filter = fql.as_deref();
        all_pages_token_offset(
            |offset, limit| async move { self.query_devices_scroll(filter, offset, limit).await },
            SCROLL_BATCH_SIZE,
        )
        .await
    }

    async fn query_devices_scroll(
        &self,
        filter: Option<&str>,
        offset: Option<String>,
        limit: u64,
    ) -> Result<FalconResponse<Vec<String>>> {
        #[derive(Serialize)]
        struct Query<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            filter: Option<&'a str>,
            limit: u64,
            #[serde(skip_serializing_if = "Option::is_none")]
            offset: Option<String>,
        }

        self.http
            .get_with_query(
                "/devices/queries/devices-scroll/v1",
                &Query {
                    filter,
                    limit,
                    offset,
                },
            )
            .await
    }

    /// Return details for every device matching the filter, keyed by device ID
    pub async fn describe_devices(
        &self,
        filters: impl Into<Fql>,
    ) -> Result<BTreeMap<String, Record>> {
        let fql = filters.into();
        info!("Describing devices according to the filter string {}", fql);

        let device_ids = self.get_device_ids(&fql).await?;
        self.get_device_data(&device_ids).await
    }

    /// Return details for a known list of device IDs
    pub async fn get_device_data(&self, device_ids: &[String]) -> Result<BTreeMap<String, Record>> {
        info!("Obtaining data for {} devices", device_ids.len());
        batch_get_data(device_ids, |ids| async move {
            self.http
                .post_json("/devices/entities/devices/v2", &IdsBody { ids: &ids })
                .await
        })
        .await
    }

    // ============== Device Actions ==============

    /// Perform a device action in batches the API accepts
    async fn perform_action(&self, action_name: &str, device_ids: &[String]) -> Result<Vec<Record>> {
        #[derive(Serialize)]
        struct Query<'a> {
            action_name: &'a str,
        }

        info!(
            "Performing action {} against {} devices",
            action_name,
            device_ids.len()
        );

        let mut results = Vec::new();
        for batch in device_ids.chunks(DEVICE_ACTION_BATCH_SIZE) {
            let response: FalconResponse<Vec<Record>> = self
                .http
                .post_json_with_query(
                    "/devices/entities/devices-actions/v2",
                    &Query { action_name },
                    &IdsBody { ids: batch },
                )
                .await?;
            results.extend(response.into_result()?.resources);
        }
        Ok(results)
    }
}
