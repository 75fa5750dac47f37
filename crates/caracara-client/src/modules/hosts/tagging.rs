//! Falcon grouping tags

use caracara_filters::Fql;
use serde::Serialize;
use tracing::info;

use super::HostsApiModule;
use crate::constants::DEVICE_ACTION_BATCH_SIZE;
use crate::error::{CaracaraError, Result};
use crate::model::{FalconResponse, Record, StringList};

impl HostsApiModule {
    /// Add tags to every host matching the filter.
    ///
    /// Tags may be given as a list or a comma-delimited string.
    pub async fn tag(
        &self,
        tags: impl Into<StringList>,
        filters: impl Into<Fql>,
    ) -> Result<Vec<Record>> {
        self.change_tags("add", tags.into(), filters.into()).await
    }

    /// Remove tags from every host matching the filter
    pub async fn untag(
        &self,
        tags: impl Into<StringList>,
        filters: impl Into<Fql>,
    ) -> Result<Vec<Record>> {
        self.change_tags("remove", tags.into(), filters.into()).await
    }

    async fn change_tags(&self, action: &str, tags: StringList, fql: Fql) -> Result<Vec<Record>> {
        if fql.is_none() {
            return Err(CaracaraError::MustProvideFilter);
        }
        if tags.is_empty() {
            return Err(CaracaraError::MissingArgument("tags".to_string()));
        }

        let device_ids = self.get_device_ids(&fql).await?;
        self.update_device_tags(action, &device_ids, &tags.0).await
    }

    async fn update_device_tags(
        &self,
        action: &str,
        device_ids: &[String],
        tags: &[String],
    ) -> Result<Vec<Record>> {
        #[derive(Serialize)]
        struct Body<'a> {
            action: &'a str,
            device_ids: &'a [String],
            tags: &'a [String],
        }

        info!(
            "Applying tag action {} with tags {:?} to {} devices",
            action,
            tags,
            device_ids.len()
        );

        let mut results = Vec::new();
        for batch in device_ids.chunks(DEVICE_ACTION_BATCH_SIZE) {
            let response: FalconResponse<Vec<Record>> = self
                .http
                .patch_json(
                    "/devices/entities/devices/tags/v1",
                    &Body {
                        action,
                        device_ids: batch,
                        tags,
                    },
                )
                .await?;
            results.extend(response.into_result()?.resources);
        }
        Ok(results)
    }
}
