//! Real Time Response batch sessions
//!
//! A single Falcon batch session reaches at most 10 000 hosts. An
//! [`RtrBatchSession`] multiplexes as many inner batch sessions as needed, so
//! one object can drive any number of hosts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::constants::{
    DEFAULT_TIMEOUT, MAX_BATCH_SESSION_HOSTS, MAX_BATCH_SESSION_THREADS, SESSION_EXPIRY,
    SESSION_REFRESH_TIMEOUT, permission_level,
};
use super::get_file::GetFile;
use crate::constants::pull_concurrency;
use crate::error::{ApiError, ApiErrors, CaracaraError, Result};
use crate::http::FalconHttpClient;
use crate::model::{FalconResponse, Record, null_default};

const BATCH_INIT_PATH: &str = "/real-time-response/combined/batch-init-session/v1";
const BATCH_REFRESH_PATH: &str = "/real-time-response/combined/batch-refresh-session/v1";
const BATCH_GET_PATH: &str = "/real-time-response/combined/batch-get-command/v1";
const SESSIONS_PATH: &str = "/real-time-response/entities/sessions/v1";

/// One Falcon batch session of up to 10 000 hosts
#[derive(Clone, Debug)]
pub struct InnerBatchSession {
    pub batch_id: String,
    /// Per-device connection results keyed by device ID
    pub devices: Record,
    pub expiry: Instant,
}

impl InnerBatchSession {
    fn new(batch_id: String, devices: Record) -> Self {
        Self {
            batch_id,
            devices,
            expiry: Instant::now() + Duration::from_secs(SESSION_EXPIRY),
        }
    }

    fn needs_refresh(&self) -> bool {
        self.expiry.saturating_duration_since(Instant::now())
            < Duration::from_secs(SESSION_REFRESH_TIMEOUT)
    }

    /// Connected devices from `device_ids`.
    fn optional_hosts(&self, device_ids: &[String]) -> Vec<String> {
        device_ids
            .iter()
            .filter(|id| self.devices.contains_key(id.as_str()))
            .cloned()
            .collect()
    }
}

/// A batch GET request issued against one inner batch session
#[derive(Clone, Debug, PartialEq)]
pub struct BatchGetCmdRequest {
    pub batch_get_cmd_req_id: String,
    pub devices: Record,
}

#[derive(Serialize)]
struct TimeoutQuery {
    timeout: u64,
    timeout_duration: String,
}

impl TimeoutQuery {
    fn new(timeout: u64) -> Self {
        Self {
            timeout,
            timeout_duration: format!("{timeout}s"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BatchInitResponse {
    #[serde(default)]
    batch_id: String,
    #[serde(default, deserialize_with = "null_default")]
    resources: Record,
    #[serde(default, deserialize_with = "null_default")]
    errors: Vec<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct Combined {
    #[serde(default, deserialize_with = "null_default")]
    resources: Record,
}

#[derive(Debug, Default, Deserialize)]
struct BatchCommandResponse {
    #[serde(default, deserialize_with = "null_default")]
    combined: Combined,
    #[serde(default)]
    batch_get_cmd_req_id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    errors: Vec<ApiError>,
}

fn check_errors(errors: Vec<ApiError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiErrors::new(errors).into())
    }
}

/// Batch RTR session spanning any number of hosts
#[derive(Debug)]
pub struct RtrBatchSession {
    http: Arc<FalconHttpClient>,
    sessions: Option<Vec<InnerBatchSession>>,
    default_timeout: u64,
}

impl RtrBatchSession {
    pub fn new(http: Arc<FalconHttpClient>) -> Self {
        Self {
            http,
            sessions: None,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Inner sessions, if connected
    pub fn sessions(&self) -> Option<&[InnerBatchSession]> {
        self.sessions.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.sessions.is_some()
    }

    fn connected_sessions(&self) -> Result<&[InnerBatchSession]> {
        self.sessions.as_deref().ok_or(CaracaraError::NotConnected)
    }

    /// Require a connection and refresh sessions that are about to expire
    async fn prepare(&mut self) -> Result<()> {
        let sessions = self.connected_sessions()?;
        if sessions.iter().any(InnerBatchSession::needs_refresh) {
            info!("Batch sessions are close to expiry; refreshing");
            self.refresh_sessions(self.default_timeout).await?;
        }
        Ok(())
    }

    // ============== Connection ==============

    /// Connect to a list of devices, splitting them into batches of 10 000
    pub async fn connect(&mut self, device_ids: &[String], queueing: bool, timeout: u64) -> Result<()> {
        #[derive(Serialize)]
        struct Body<'a> {
            host_ids: &'a [String],
            queue_offline: bool,
        }

        info!("Establishing an RTR batch session with {} systems", device_ids.len());
        debug!("{:?}", device_ids);

        let batches: Vec<&[String]> = device_ids.chunks(MAX_BATCH_SESSION_HOSTS).collect();
        info!("Divided up devices into {} batches", batches.len());

        let http = &self.http;
        let query = TimeoutQuery::new(timeout);
        let query = &query;

        let sessions: Vec<InnerBatchSession> = stream::iter(batches)
            .map(|host_ids| async move {
                info!("Batch worker started with a list of {} devices", host_ids.len());
                let response: BatchInitResponse = http
                    .post_json_with_query(
                        BATCH_INIT_PATH,
                        query,
                        &Body {
                            host_ids,
                            queue_offline: queueing,
                        },
                    )
                    .await?;
                check_errors(response.errors)?;
                info!("Connected to {} systems", response.resources.len());
                Ok::<_, CaracaraError>(InnerBatchSession::new(response.batch_id, response.resources))
            })
            .buffered(MAX_BATCH_SESSION_THREADS)
            .try_collect()
            .await?;

        let device_count: usize = sessions.iter().map(|s| s.devices.len()).sum();
        info!("Connected to {} devices", device_count);

        self.sessions = Some(sessions);
        Ok(())
    }

    /// Every device ID across all inner sessions
    pub async fn device_ids(&mut self) -> Result<Vec<String>> {
        self.prepare().await?;
        let sessions = self.connected_sessions()?;
        Ok(sessions
            .iter()
            .flat_map(|s| s.devices.keys().cloned())
            .collect())
    }

    /// Close every inner batch session
    pub async fn disconnect(&mut self) -> Result<()> {
        #[derive(Serialize)]
        struct Query<'a> {
            session_id: &'a str,
        }

        self.prepare().await?;
        for session in self.connected_sessions()? {
            info!("Disconnecting batch RTR session with ID {}", session.batch_id);
            let _: Value = self
                .http
                .delete_with_query(
                    SESSIONS_PATH,
                    &Query {
                        session_id: &session.batch_id,
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Refresh every inner session and reset its expiry
    pub async fn refresh_sessions(&mut self, timeout: u64) -> Result<()> {
        #[derive(Serialize)]
        struct Body<'a> {
            batch_id: &'a str,
        }

        info!("Refreshing batch RTR session");

        let http = &self.http;
        let query = TimeoutQuery::new(timeout);
        let query = &query;

        let refreshed: Vec<String> = stream::iter(self.connected_sessions()?)
            .map(|session| async move {
                info!("Refreshing batch session {}", session.batch_id);
                let response: FalconResponse<Value> = http
                    .post_json_with_query(
                        BATCH_REFRESH_PATH,
                        query,
                        &Body {
                            batch_id: &session.batch_id,
                        },
                    )
                    .await?;
                response.into_result()?;
                Ok::<_, CaracaraError>(session.batch_id.clone())
            })
            .buffered(MAX_BATCH_SESSION_THREADS)
            .try_collect()
            .await?;

        let expiry = Instant::now() + Duration::from_secs(SESSION_EXPIRY);
        if let Some(sessions) = self.sessions.as_mut() {
            for session in sessions.iter_mut() {
                session.expiry = expiry;
            }
        }
        for batch_id in refreshed {
            info!("Refreshed session {}", batch_id);
        }
        Ok(())
    }

    // ============== Commands ==============

    /// Send one request per inner session, narrowing each to the requested
    /// devices. Sessions holding none of the requested devices are skipped.
    async fn run_on_sessions<B, F>(
        &self,
        path: &str,
        timeout: u64,
        device_ids: Option<&[String]>,
        build_body: F,
    ) -> Result<Vec<BatchCommandResponse>>
    where
        B: Serialize,
        F: Fn(String, Option<Vec<String>>) -> B,
    {
        let http = &self.http;
        let query = TimeoutQuery::new(timeout);
        let query = &query;
        let build_body = &build_body;

        let targets: Vec<(&InnerBatchSession, Option<Vec<String>>)> = self
            .connected_sessions()?
            .iter()
            .filter_map(|session| match device_ids {
                Some(ids) => {
                    let hosts = session.optional_hosts(ids);
                    (!hosts.is_empty()).then_some((session, Some(hosts)))
                }
                None => Some((session, None)),
            })
            .collect();

        stream::iter(targets)
            .map(|(session, optional_hosts)| async move {
                info!("Executing {} against RTR batch {}", path, session.batch_id);
                let body = build_body(session.batch_id.clone(), optional_hosts);
                let mut response: BatchCommandResponse =
                    http.post_json_with_query(path, query, &body).await?;
                debug!("{:?}", response);
                check_errors(std::mem::take(&mut response.errors))?;
                Ok::<_, CaracaraError>(response)
            })
            .buffered(MAX_BATCH_SESSION_THREADS)
            .try_collect()
            .await
    }

    /// Run any RTR command against every connected host, or a subset.
    ///
    /// The command's permission level decides which batch endpoint is used.
    /// Results are keyed by device ID.
    pub async fn run_generic_command(
        &mut self,
        command_string: &str,
        device_ids: Option<&[String]>,
        timeout: u64,
    ) -> Result<Record> {
        #[derive(Serialize)]
        struct Body<'a> {
            base_command: &'a str,
            batch_id: String,
            command_string: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            optional_hosts: Option<Vec<String>>,
        }

        let (base_command, level) = permission_level(command_string)?;
        self.prepare().await?;

        info!("Executing a command via RTR: {}", command_string);
        debug!("{} requires the {} permission level", base_command, level);

        let responses = self
            .run_on_sessions(level.batch_endpoint(), timeout, device_ids, |batch_id, optional_hosts| {
                Body {
                    base_command,
                    batch_id,
                    command_string,
                    optional_hosts,
                }
            })
            .await?;

        let mut all_responses = Record::new();
        for response in responses {
            info!(
                "Executed commands on a batch of {} hosts",
                response.combined.resources.len()
            );
            all_responses.extend(response.combined.resources);
        }
        Ok(all_responses)
    }

    /// Run a raw script via `runscript -Raw`.
    ///
    /// The request timeout defaults to ten seconds longer than the script timeout.
    pub async fn run_raw_script(
        &mut self,
        script_text: &str,
        script_timeout: u64,
        device_ids: Option<&[String]>,
        timeout: Option<u64>,
    ) -> Result<Record> {
        let command_string = format!("runscript -Raw=```{script_text}``` -Timeout={script_timeout}");
        let timeout = timeout.unwrap_or(script_timeout + 10);
        self.run_generic_command(&command_string, device_ids, timeout)
            .await
    }

    // ============== File Retrieval ==============

    /// Retrieve the file at `file_path` from every connected host, or a subset
    pub async fn get(
        &mut self,
        file_path: &str,
        device_ids: Option<&[String]>,
        timeout: u64,
    ) -> Result<Vec<BatchGetCmdRequest>> {
        #[derive(Serialize)]
        struct Body<'a> {
            batch_id: String,
            file_path: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            optional_hosts: Option<Vec<String>>,
        }

        self.prepare().await?;
        info!("Using a batch GET to retrieve the file at path {}", file_path);

        let responses = self
            .run_on_sessions(BATCH_GET_PATH, timeout, device_ids, |batch_id, optional_hosts| Body {
                batch_id,
                file_path,
                optional_hosts,
            })
            .await?;

        responses
            .into_iter()
            .map(|response| {
                let batch_get_cmd_req_id = response.batch_get_cmd_req_id.ok_or_else(|| {
                    CaracaraError::InvalidArgument(
                        "batch GET response has no batch_get_cmd_req_id".to_string(),
                    )
                })?;
                info!(
                    "Issued batch GET {} to {} hosts",
                    batch_get_cmd_req_id,
                    response.combined.resources.len()
                );
                Ok(BatchGetCmdRequest {
                    batch_get_cmd_req_id,
                    devices: response.combined.resources,
                })
            })
            .collect()
    }

    /// Files uploaded so far for a list of batch GET requests
    pub async fn get_status(
        &self,
        requests: &[BatchGetCmdRequest],
        timeout: u64,
    ) -> Result<Vec<GetFile>> {
        info!("Checking the status of {} batch get requests", requests.len());

        let files: Vec<Vec<GetFile>> = stream::iter(requests)
            .map(|request| self.get_status_by_req_id(&request.batch_get_cmd_req_id, timeout))
            .buffered(pull_concurrency())
            .try_collect()
            .await?;

        Ok(files.into_iter().flatten().collect())
    }

    /// Files uploaded so far for a single batch GET request
    pub async fn get_status_by_req_id(
        &self,
        batch_get_cmd_req_id: &str,
        timeout: u64,
    ) -> Result<Vec<GetFile>> {
        #[derive(Serialize)]
        struct Query<'a> {
            batch_get_cmd_req_id: &'a str,
            timeout: u64,
            timeout_duration: String,
        }

        #[derive(Deserialize)]
        struct Entry {
            name: String,
            session_id: String,
            sha256: String,
            #[serde(default)]
            size: u64,
        }

        info!("Checking the status of a batch get with ID {}", batch_get_cmd_req_id);

        let response: FalconResponse<Value> = self
            .http
            .get_with_query(
                BATCH_GET_PATH,
                &Query {
                    batch_get_cmd_req_id,
                    timeout,
                    timeout_duration: format!("{timeout}s"),
                },
            )
            .await?;
        let response = response.into_result()?;

        let Value::Object(resources) = response.resources else {
            return Ok(Vec::new());
        };
        info!("Batch GET has retrieved {} files so far", resources.len());

        resources
            .into_iter()
            .map(|(device_id, entry)| {
                let entry: Entry = serde_json::from_value(entry)?;
                Ok(GetFile {
                    device_id,
                    filename: entry.name,
                    session_id: entry.session_id,
                    sha256: entry.sha256,
                    size: entry.size,
                    http: Arc::clone(&self.http),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ClientConfig;
    use serde_json::json;

    fn session(devices: &[&str]) -> InnerBatchSession {
        let devices = devices
            .iter()
            .map(|id| (id.to_string(), json!({"complete": true})))
            .collect();
        InnerBatchSession::new("batch".to_string(), devices)
    }

    #[test]
    fn test_optional_hosts() {
        let session = session(&["a", "b"]);
        let wanted = vec!["b".to_string(), "z".to_string()];
        assert_eq!(session.optional_hosts(&wanted), vec!["b".to_string()]);
        assert!(session.optional_hosts(&["z".to_string()]).is_empty());
    }

    #[test]
    fn test_needs_refresh() {
        let mut session = session(&["a"]);
        assert!(!session.needs_refresh());
        session.expiry = Instant::now() + Duration::from_secs(60);
        assert!(session.needs_refresh());
    }

    #[test]
    fn test_timeout_query() {
        let query = TimeoutQuery::new(45);
        assert_eq!(query.timeout_duration, "45s");
    }

    #[test]
    fn test_command_response_parsing() {
        let response: BatchCommandResponse = serde_json::from_value(json!({
            "batch_get_cmd_req_id": "req",
            "combined": {"resources": {"dev": {"stdout": "ok"}}},
            "errors": null
        }))
        .unwrap();
        assert_eq!(response.batch_get_cmd_req_id.as_deref(), Some("req"));
        assert_eq!(response.combined.resources["dev"]["stdout"], "ok");
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let http = Arc::new(FalconHttpClient::new(ClientConfig::new("id", "secret")).unwrap());
        let mut batch = RtrBatchSession::new(http);
        assert!(!batch.is_connected());
        assert!(matches!(
            batch.device_ids().await,
            Err(CaracaraError::NotConnected)
        ));
        assert!(matches!(
            batch.run_generic_command("ls", None, 30).await,
            Err(CaracaraError::NotConnected)
        ));
        assert!(matches!(
            batch.refresh_sessions(30).await,
            Err(CaracaraError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_invalid_command_rejected_first() {
        let http = Arc::new(FalconHttpClient::new(ClientConfig::new("id", "secret")).unwrap());
        let mut batch = RtrBatchSession::new(http);
        assert!(matches!(
            batch.run_generic_command("format C:", None, 30).await,
            Err(CaracaraError::InvalidRtrCommand(_))
        ));
    }
}
