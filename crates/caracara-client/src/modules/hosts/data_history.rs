//! Login and network address history

use std::collections::BTreeMap;

use caracara_filters::Fql;
use tracing::info;

use super::HostsApiModule;
use crate::batching::batch_get_data;
use crate::error::Result;
use crate::model::{IdsBody, Record, ids_query, record_str};

impl HostsApiModule {
    /// Return recent logins for every device matching the filter
    pub async fn describe_login_history(
        &self,
        filters: impl Into<Fql>,
    ) -> Result<BTreeMap<String, Record>> {
        let fql = filters.into();
        info!("Describing login history for devices matching the filter: {}", fql);

        let device_ids = self.get_device_ids(&fql).await?;
        batch_get_data(&device_ids, |ids| async move {
            self.http
                .post_json(
                    "/devices/combined/devices/login-history/v1",
                    &IdsBody { ids: &ids },
                )
                .await
        })
        .await
    }

    /// Return IP address history for every device matching the filter
    pub async fn describe_network_address_history(
        &self,
        filters: impl Into<Fql>,
    ) -> Result<BTreeMap<String, Record>> {
        let fql = filters.into();
        info!("Describing network address history for devices matching the filter: {}", fql);

        let device_ids = self.get_device_ids(&fql).await?;
        batch_get_data(&device_ids, |ids| async move {
            self.http
                .post_json(
                    "/devices/combined/devices/network-address-history/v1",
                    &IdsBody { ids: &ids },
                )
                .await
        })
        .await
    }

    /// Return device details with each device's online `state` merged in
    pub async fn describe_state(
        &self,
        filters: impl Into<Fql>,
    ) -> Result<BTreeMap<String, Record>> {
        let fql = filters.into();
        info!("Describing device states according to the filter string {}", fql);

        let device_ids = self.get_device_ids(&fql).await?;
        let mut device_data = self.get_device_data(&device_ids).await?;
        let states = self.get_online_state(&device_ids).await?;

        for (device_id, state) in states {
            if let Some(device) = device_data.get_mut(&device_id) {
                let state = record_str(&state, "state").unwrap_or("unknown");
                device.insert("state".to_string(), state.into());
            }
        }

        Ok(device_data)
    }

    /// Return online state records for a known list of device IDs
    pub async fn get_online_state(&self, device_ids: &[String]) -> Result<BTreeMap<String, Record>> {
        info!("Obtaining online state data for {} devices", device_ids.len());
        batch_get_data(device_ids, |ids| async move {
            self.http
                .get_with_query("/devices/entities/online-state/v1", &ids_query(&ids))
                .await
        })
        .await
    }
}
