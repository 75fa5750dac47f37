//! Real Time Response (RTR) API
//!
//! Batch sessions against any number of hosts, the offline session queue,
//! PUT files and cloud scripts.

mod batch_session;
pub mod constants;
mod get_file;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use caracara_filters::Fql;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::batching::batch_get_data;
use crate::constants::PAGINATION_LIMIT;
use crate::error::{CaracaraError, Result};
use crate::http::FalconHttpClient;
use crate::model::{FalconResponse, IdsBody, Record, ids_query};
use crate::pagination::all_pages_numbered_offset_parallel;

pub use batch_session::{BatchGetCmdRequest, InnerBatchSession, RtrBatchSession};
pub use constants::PermissionLevel;
pub use get_file::GetFile;

const QUEUED_SESSIONS_FILTER: &str = "offline_queued: 1+deleted_at: null";
const PUT_FILE_CONTENT_TYPE: &str = "application/script";

#[derive(Serialize)]
struct NumberedQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    offset: u64,
    limit: u64,
}

/// Interface with hosts via the Real Time Response API
pub struct RtrApiModule {
    http: Arc<FalconHttpClient>,
}

impl RtrApiModule {
    pub const NAME: &'static str = "RTR API Module";

    pub fn new(http: Arc<FalconHttpClient>) -> Self {
        debug!("Configuring the RTR API");
        Self { http }
    }

    /// Create a batch session; call [`RtrBatchSession::connect`] before use
    pub fn batch_session(&self) -> RtrBatchSession {
        RtrBatchSession::new(Arc::clone(&self.http))
    }

    /// Query IDs from a numeric-offset endpoint
    async fn query_ids(&self, path: &str, filter: Option<&str>) -> Result<Vec<String>> {
        all_pages_numbered_offset_parallel(
            |offset, limit| async move {
                let response: FalconResponse<Vec<String>> = self
                    .http
                    .get_with_query(
                        path,
                        &NumberedQuery {
                            filter,
                            offset,
                            limit,
                        },
                    )
                    .await?;
                Ok(response)
            },
            PAGINATION_LIMIT,
        )
        .await
    }

    /// Fetch entities by ID from a GET endpoint taking repeated `ids`
    async fn get_entities(&self, path: &str, ids: &[String]) -> Result<BTreeMap<String, Record>> {
        batch_get_data(ids, |batch| async move {
            self.http.get_with_query(path, &ids_query(&batch)).await
        })
        .await
    }

    // ============== Queued Sessions ==============

    async fn search_sessions(&self, filters: impl Into<Fql>) -> Result<Vec<String>> {
        let fql = filters.into();
        info!("Searching for RTR sessions based on filter string: {}", fql);
        self.query_ids("/real-time-response/queries/sessions/v1", fql.as_deref())
            .await
    }

    async fn get_queued_session_ids(&self) -> Result<Vec<String>> {
        info!("Searching for queued RTR sessions");
        self.search_sessions(QUEUED_SESSIONS_FILTER).await
    }

    /// Contents of every queued RTR session, keyed by session ID
    pub async fn describe_queued_sessions(&self) -> Result<BTreeMap<String, Record>> {
        info!("Describing all queued RTR sessions");
        let session_ids = self.get_queued_session_ids().await?;
        batch_get_data(&session_ids, |ids| async move {
            self.http
                .post_json("/real-time-response/entities/sessions/GET/v1", &IdsBody { ids: &ids })
                .await
        })
        .await
    }

    pub async fn delete_queued_session(&self, session_id: &str) -> Result<()> {
        #[derive(Serialize)]
        struct Query<'a> {
            session_id: &'a str,
        }

        info!("Deleting queued session with ID {}", session_id);
        let response: FalconResponse<Value> = self
            .http
            .delete_with_query("/real-time-response/entities/sessions/v1", &Query { session_id })
            .await?;
        response.into_result()?;
        Ok(())
    }

    /// Delete one command from a queued session
    pub async fn delete_queued_session_command(
        &self,
        session_id: &str,
        cloud_request_id: &str,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct Query<'a> {
            session_id: &'a str,
            cloud_request_id: &'a str,
        }

        info!(
            "Deleting command with ID {} from queued session {}",
            cloud_request_id, session_id
        );
        let response: FalconResponse<Value> = self
            .http
            .delete_with_query(
                "/real-time-response/entities/queued-sessions/command/v1",
                &Query {
                    session_id,
                    cloud_request_id,
                },
            )
            .await?;
        response.into_result()?;
        Ok(())
    }

    /// Delete every queued session
    pub async fn clear_queued_sessions(&self) -> Result<()> {
        info!("Clearing all queued RTR sessions");
        for session_id in self.get_queued_session_ids().await? {
            self.delete_queued_session(&session_id).await?;
        }
        Ok(())
    }

    // ============== PUT Files ==============

    /// PUT files matching the filter, keyed by ID
    pub async fn describe_put_files(&self, filters: impl Into<Fql>) -> Result<BTreeMap<String, Record>> {
        let fql = filters.into();
        info!("Querying RTR put files using the filter string {}", fql);

        let put_file_ids = self
            .query_ids("/real-time-response/queries/put-files/v1", fql.as_deref())
            .await?;
        info!("Retrieved {} PUT file IDs", put_file_ids.len());
        debug!("{:?}", put_file_ids);

        self.get_entities("/real-time-response/entities/put-files/v1", &put_file_ids)
            .await
    }

    /// Upload a file to the Falcon cloud for later use with `put`.
    ///
    /// `name` defaults to the file's name on disk and `description` to the
    /// upload time.
    pub async fn create_put_file(
        &self,
        file_path: &Path,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        if !file_path.is_file() {
            info!("{} is not a valid file", file_path.display());
            return Err(CaracaraError::InvalidArgument(format!(
                "{} is not a valid file on disk",
                file_path.display()
            )));
        }

        let name = match name {
            Some(name) => name.to_string(),
            None => file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| CaracaraError::MissingArgument("name".to_string()))?,
        };
        let description = description.map(str::to_string).unwrap_or_else(|| {
            format!(
                "File uploaded via Caracara at {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
            )
        });

        info!(
            "Uploading {} to Falcon with name {} and description {}",
            file_path.display(),
            name,
            description
        );

        let contents = tokio::fs::read(file_path).await?;
        let mut part_headers = HeaderMap::new();
        part_headers.insert(CONTENT_TYPE, HeaderValue::from_static(PUT_FILE_CONTENT_TYPE));

        let response: FalconResponse<Value> = self
            .http
            .post_multipart("/real-time-response/entities/put-files/v1", || {
                let part = Part::bytes(contents.clone())
                    .file_name(name.clone())
                    .headers(part_headers.clone());
                Form::new()
                    .part("file", part)
                    .text("name", name.clone())
                    .text("description", description.clone())
            })
            .await?;
        response.into_result()?;
        Ok(())
    }

    pub async fn delete_put_file(&self, put_file_id: &str) -> Result<()> {
        #[derive(Serialize)]
        struct Query<'a> {
            ids: &'a str,
        }

        info!("Deleting PUT file with ID {}", put_file_id);
        let response: FalconResponse<Value> = self
            .http
            .delete_with_query(
                "/real-time-response/entities/put-files/v1",
                &Query { ids: put_file_id },
            )
            .await?;
        response.into_result()?;
        Ok(())
    }

    // ============== Scripts ==============

    /// Cloud scripts matching the filter, including their contents
    pub async fn describe_scripts(&self, filters: impl Into<Fql>) -> Result<BTreeMap<String, Record>> {
        let fql = filters.into();
        info!("Querying RTR scripts using the filter string {}", fql);

        let script_ids = self
            .query_ids("/real-time-response/queries/scripts/v1", fql.as_deref())
            .await?;
        info!("Retrieved {} script IDs", script_ids.len());

        self.get_entities("/real-time-response/entities/scripts/v1", &script_ids)
            .await
    }
}
