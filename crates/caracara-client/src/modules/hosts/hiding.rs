//! Hiding hosts from the Falcon UI

use std::collections::BTreeMap;

use caracara_filters::Fql;
use serde::Serialize;
use tracing::info;

use super::HostsApiModule;
use crate::constants::SCROLL_BATCH_SIZE;
use crate::error::{CaracaraError, Result};
use crate::model::{FalconResponse, Record};
use crate::pagination::all_pages_numbered_offset_parallel;

impl HostsApiModule {
    /// Return the ID of every hidden device matching the filter
    pub async fn get_hidden_ids(&self, filters: impl Into<Fql>) -> Result<Vec<String>> {
        #[derive(Serialize)]
        struct Query<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            filter: Option<&'a str>,
            offset: u64,
            limit: u64,
        }

        let fql = filters.into();
        info!("Getting the IDs of all hidden devices using the filter: {}", fql);

        let filter = fql.as_deref();
        all_pages_numbered_offset_parallel(
            |offset, limit| async move {
                let response: FalconResponse<Vec<String>> = self
                    .http
                    .get_with_query(
                        "/devices/queries/devices-hidden/v1",
                        &Query {
                            filter,
                            offset,
                            limit,
                        },
                    )
                    .await?;
                Ok(response)
            },
            SCROLL_BATCH_SIZE,
        )
        .await
    }

    /// Return details for every hidden device matching the filter
    pub async fn describe_hidden_devices(
        &self,
        filters: impl Into<Fql>,
    ) -> Result<BTreeMap<String, Record>> {
        let fql = filters.into();
        info!("Describing hidden devices based on the filter string {}", fql);

        let device_ids = self.get_hidden_ids(&fql).await?;
        self.get_device_data(&device_ids).await
    }

    /// Hide every host matching the filter
    pub async fn hide(&self, filters: impl Into<Fql>) -> Result<Vec<Record>> {
        let fql = filters.into();
        if fql.is_none() {
            return Err(CaracaraError::MustProvideFilter);
        }

        let device_ids = self.get_device_ids(&fql).await?;
        self.perform_action("hide_host", &device_ids).await
    }

    /// Unhide every hidden host matching the filter
    pub async fn unhide(&self, filters: impl Into<Fql>) -> Result<Vec<Record>> {
        let fql = filters.into();
        if fql.is_none() {
            return Err(CaracaraError::MustProvideFilter);
        }

        let device_ids = self.get_hidden_ids(&fql).await?;
        if device_ids.is_empty() {
            return Err(CaracaraError::DeviceNotFound);
        }
        self.perform_action("unhide_host", &device_ids).await
    }
}
