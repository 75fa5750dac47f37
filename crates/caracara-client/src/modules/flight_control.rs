//! Flight Control (MSSP) API

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::batching::batch_get_data;
use crate::error::Result;
use crate::http::FalconHttpClient;
use crate::model::{FalconResponse, IdsBody, Record};
use crate::pagination::all_pages_numbered_offset_parallel;

/// Page size accepted by the child CID query
const CHILD_CID_PAGE_SIZE: u64 = 10;

/// Manage the child CIDs of a Flight Control parent tenant
pub struct FlightControlApiModule {
    http: Arc<FalconHttpClient>,
}

impl FlightControlApiModule {
    pub const NAME: &'static str = "CrowdStrike Falcon Flight Control API Module";

    pub fn new(http: Arc<FalconHttpClient>) -> Self {
        debug!("Configuring the Flight Control API");
        Self { http }
    }

    /// Every child CID owned by the parent tenant
    pub async fn get_child_cids(&self) -> Result<Vec<String>> {
        #[derive(Serialize)]
        struct Query {
            offset: u64,
            limit: u64,
        }

        info!("Obtaining a list of all Child CIDs");
        all_pages_numbered_offset_parallel(
            |offset, limit| async move {
                let response: FalconResponse<Vec<String>> = self
                    .http
                    .get_with_query("/mssp/queries/children/v1", &Query { offset, limit })
                    .await?;
                Ok(response)
            },
            CHILD_CID_PAGE_SIZE,
        )
        .await
    }

    /// Details for each child CID, keyed by CID
    pub async fn get_child_cid_data(&self, cids: &[String]) -> Result<BTreeMap<String, Record>> {
        info!("Obtaining data for {} child CIDs", cids.len());
        batch_get_data(cids, |ids| async move {
            self.http
                .post_json("/mssp/entities/children/GET/v2", &IdsBody { ids: &ids })
                .await
        })
        .await
    }

    pub async fn describe_child_cids(&self) -> Result<BTreeMap<String, Record>> {
        info!("Describing this Parent CID's Child CIDs");
        let child_cids = self.get_child_cids().await?;
        self.get_child_cid_data(&child_cids).await
    }
}
