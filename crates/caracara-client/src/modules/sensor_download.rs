//! Sensor Download API

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ApiErrors, CaracaraError, Result};
use crate::http::FalconHttpClient;
use crate::model::FalconResponse;

/// Retrieve the installation CCID of the authenticated tenant
pub struct SensorDownloadApiModule {
    http: Arc<FalconHttpClient>,
}

impl SensorDownloadApiModule {
    pub const NAME: &'static str = "CrowdStrike Sensor Download API Module";

    pub fn new(http: Arc<FalconHttpClient>) -> Self {
        debug!("Configuring the Sensor Download API");
        Self { http }
    }

    /// Customer ID of the authenticated tenant.
    ///
    /// With `include_checksum` the checksummed CCID (`CID-XX`) needed by
    /// sensor installers is returned as is; otherwise the checksum is
    /// stripped and the CID lowercased.
    pub async fn get_cid(&self, include_checksum: bool) -> Result<String> {
        #[derive(Serialize)]
        struct Query {}

        info!("Obtaining the CCID from the cloud using the Sensor Download API");
        let response: FalconResponse<Vec<String>> = self
            .http
            .get_with_query("/sensors/queries/installers/ccid/v1", &Query {})
            .await?;
        debug!("{:?}", response);

        let Some(ccid) = response.resources.into_iter().next() else {
            info!("Failed to retrieve the CCID from the cloud. Check your API credentials.");
            return Err(CaracaraError::Api(ApiErrors::new(response.errors)));
        };

        if include_checksum {
            Ok(ccid)
        } else {
            Ok(strip_checksum(&ccid))
        }
    }
}

/// Convert a CCID such as `ABCDEF-12` into a lowercase CID
pub fn strip_checksum(ccid: &str) -> String {
    let end = ccid
        .char_indices()
        .rev()
        .nth(2)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    ccid[..end].to_lowercase()
}
