//! HTTP client with OAuth2 authentication, rate limiting and retries
//!
//! This module provides the transport shared by every API module. Tokens are
//! cached until shortly before they expire, rejected tokens trigger one
//! re-authentication, and rate-limited requests wait for the window the API
//! reports before trying again.

use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, error, info, warn};

use crate::cloud::{CloudRegion, CloudTarget};
use crate::constants::USER_AGENT;
use crate::error::{ApiError, ApiErrors, CaracaraError, Result};
use crate::model::FalconResponse;

/// Tokens are refreshed when less than this much lifetime remains
const TOKEN_REFRESH_BUFFER: Duration = Duration::from_secs(300);

/// Longest time spent waiting on a single rate limit response
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

const REGION_HEADER: &str = "x-cs-region";
const RETRY_AFTER_HEADER: &str = "x-ratelimit-retryafter";

/// Configuration for the Falcon HTTP client
#[derive(Clone)]
pub struct ClientConfig {
    /// OAuth2 API client ID
    pub client_id: String,
    /// OAuth2 API client secret
    pub client_secret: String,
    /// `auto`, a region name such as `us-2`, or a full base URL
    pub cloud_name: String,
    /// Child CID to act on when authenticating from a Flight Control parent
    pub member_cid: Option<String>,
    /// Verify TLS certificates
    pub ssl_verify: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Proxy URL applied to all requests
    pub proxy: Option<String>,
    pub user_agent: String,
    /// Log every request URL at debug level
    pub verbose: bool,
    /// Base URL that takes precedence over the cloud name
    pub base_url_override: Option<String>,
    /// Retries allowed for rate-limited requests
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            cloud_name: "auto".to_string(),
            member_cid: None,
            ssl_verify: true,
            timeout_secs: 30,
            proxy: None,
            user_agent: USER_AGENT.to_string(),
            verbose: false,
            base_url_override: None,
            max_retries: 3,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("cloud_name", &self.cloud_name)
            .field("member_cid", &self.member_cid)
            .field("ssl_verify", &self.ssl_verify)
            .field("timeout_secs", &self.timeout_secs)
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .field("verbose", &self.verbose)
            .field("base_url_override", &self.base_url_override)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new config from API credentials
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            ..Default::default()
        }
    }

    /// Set the cloud name
    pub fn with_cloud(mut self, cloud_name: &str) -> Self {
        self.cloud_name = cloud_name.to_string();
        self
    }

    /// Authenticate against a child CID
    pub fn with_member_cid(mut self, member_cid: &str) -> Self {
        self.member_cid = Some(member_cid.to_string());
        self
    }

    pub fn with_ssl_verify(mut self, ssl_verify: bool) -> Self {
        self.ssl_verify = ssl_verify;
        self
    }

    /// Set the request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Send requests to a fixed base URL, ignoring the cloud name
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url_override = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Token info for authentication
#[derive(Clone, Debug)]
struct TokenInfo {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    1799
}

/// How long to wait after a 429 response.
///
/// The header holds the epoch second at which the rate limit window resets.
pub(crate) fn rate_limit_wait(retry_after: Option<&str>, now_epoch: i64) -> Duration {
    let seconds = retry_after
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|reset| (reset - now_epoch).max(1))
        .unwrap_or(1);
    Duration::from_secs(seconds as u64).min(MAX_RATE_LIMIT_WAIT)
}

/// HTTP client shared by every Falcon API module
pub struct FalconHttpClient {
    client: Client,
    config: ClientConfig,
    cloud: CloudTarget,
    base_url: RwLock<String>,
    token: RwLock<Option<TokenInfo>>,
}

impl fmt::Debug for FalconHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FalconHttpClient")
            .field("base_url", &self.base_url())
            .field("config", &self.config)
            .finish()
    }
}

impl FalconHttpClient {
    /// Create a new HTTP client. No request is made until the first call.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let cloud = CloudTarget::parse(&config.cloud_name)?;
        let base_url = config
            .base_url_override
            .clone()
            .unwrap_or_else(|| cloud.initial_base_url());

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(!config.ssl_verify);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        debug!("Initialising Falcon HTTP client for {}", base_url);

        Ok(Self {
            client: builder.build()?,
            config,
            cloud,
            base_url: RwLock::new(base_url),
            token: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base URL currently in use
    pub fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Get the current access token if it is not close to expiry
    fn get_token(&self) -> Option<String> {
        let token_guard = self.token.read();
        token_guard.as_ref().and_then(|t| {
            if t.expires_at > Instant::now() + TOKEN_REFRESH_BUFFER {
                Some(t.access_token.clone())
            } else {
                None
            }
        })
    }

    fn set_token(&self, access_token: String, ttl_seconds: u64) {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds);
        *self.token.write() = Some(TokenInfo {
            access_token,
            expires_at,
        });
    }

    fn clear_token(&self) {
        *self.token.write() = None;
    }

    /// Whether a token is cached
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Request a new OAuth2 token
    pub async fn authenticate(&self) -> Result<()> {
        let url = self.build_url("/oauth2/token");

        debug!("Authenticating with Falcon: {}", url);

        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        if let Some(member_cid) = &self.config.member_cid {
            form.push(("member_cid", member_cid.as_str()));
        }

        let response = self.client.post(&url).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Authentication failed with status {}: {}", status, body);
            return Err(CaracaraError::Auth(format!(
                "token request failed with status {status}: {body}"
            )));
        }

        if self.cloud.is_auto() && self.config.base_url_override.is_none() {
            let region = response
                .headers()
                .get(REGION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if let Some(region) = region {
                self.follow_region(&region);
            }
        }

        let token: TokenResponse = response.json().await?;
        self.set_token(token.access_token, token.expires_in);
        debug!(
            "Authentication successful, token expires in {} seconds",
            token.expires_in
        );
        Ok(())
    }

    fn follow_region(&self, region: &str) {
        match region.parse::<CloudRegion>() {
            Ok(region) => {
                let current = self.base_url();
                if current != region.base_url() {
                    info!("Falcon reported the {} cloud, switching base URL", region);
                    *self.base_url.write() = region.base_url().to_string();
                }
            }
            Err(_) => warn!("Ignoring unrecognised cloud region {}", region),
        }
    }

    /// Ensure we have a valid token, refreshing if needed
    async fn ensure_token(&self) -> Result<String> {
        if let Some(token) = self.get_token() {
            return Ok(token);
        }

        self.authenticate().await?;

        self.get_token()
            .ok_or_else(|| CaracaraError::Auth("no token after authentication".to_string()))
    }

    /// Revoke the cached token
    pub async fn revoke(&self) -> Result<()> {
        let token = self.token.read().as_ref().map(|t| t.access_token.clone());
        let Some(token) = token else {
            return Ok(());
        };

        let url = self.build_url("/oauth2/revoke");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("token", token.as_str())])
            .send()
            .await?;

        self.clear_token();

        if response.status().is_success() {
            debug!("Token revoked");
        } else {
            warn!("Token revocation returned status {}", response.status());
        }
        Ok(())
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        self.request_with_retry(
            |client, url, token| async move {
                client.get(&url).bearer_auth(&token).query(query).send().await
            },
            path,
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request_with_retry(
            |client, url, token| async move {
                client.post(&url).bearer_auth(&token).json(body).send().await
            },
            path,
        )
        .await
    }

    /// Make a POST request with query parameters and a JSON body
    pub async fn post_json_with_query<T, Q, B>(&self, path: &str, query: &Q, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        self.request_with_retry(
            |client, url, token| async move {
                client
                    .post(&url)
                    .bearer_auth(&token)
                    .query(query)
                    .json(body)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Make a PATCH request with JSON body
    pub async fn patch_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request_with_retry(
            |client, url, token| async move {
                client.patch(&url).bearer_auth(&token).json(body).send().await
            },
            path,
        )
        .await
    }

    /// Make a DELETE request with query parameters
    pub async fn delete_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        self.request_with_retry(
            |client, url, token| async move {
                client.delete(&url).bearer_auth(&token).query(query).send().await
            },
            path,
        )
        .await
    }

    /// Make a GET request and return raw bytes
    pub async fn get_bytes_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Bytes> {
        let response = self
            .send_with_retry(
                |client, url, token| async move {
                    client.get(&url).bearer_auth(&token).query(query).send().await
                },
                path,
            )
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.bytes().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(api_error_from_body(status, &body))
        }
    }

    /// Make a POST request with multipart form data (for file uploads).
    ///
    /// A multipart form cannot be cloned, so `build_form` is called again for
    /// every attempt.
    pub async fn post_multipart<T, F>(&self, path: &str, build_form: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::multipart::Form,
    {
        self.request_with_retry(
            |client, url, token| {
                let form = build_form();
                async move {
                    client
                        .post(&url)
                        .bearer_auth(&token)
                        .multipart(form)
                        .send()
                        .await
                }
            },
            path,
        )
        .await
    }

    /// Send a request, re-authenticating once on 401 and waiting out 429s
    async fn send_with_retry<F, Fut>(&self, request_fn: F, path: &str) -> Result<Response>
    where
        F: Fn(Client, String, String) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<Response, reqwest::Error>>,
    {
        let mut reauthenticated = false;
        let mut retries = 0;

        loop {
            let url = self.build_url(path);
            let token = self.ensure_token().await?;

            if self.config.verbose {
                debug!("Sending request to {}", url);
            }

            let response = request_fn(self.client.clone(), url, token).await?;

            match response.status() {
                StatusCode::UNAUTHORIZED if !reauthenticated => {
                    warn!("Token rejected, re-authenticating...");
                    reauthenticated = true;
                    self.clear_token();
                    self.authenticate().await?;
                }
                StatusCode::TOO_MANY_REQUESTS if retries < self.config.max_retries => {
                    retries += 1;
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER_HEADER)
                        .and_then(|v| v.to_str().ok());
                    let wait = rate_limit_wait(retry_after, chrono::Utc::now().timestamp());
                    warn!(
                        "Rate limited on {}, retrying in {:?} (attempt {}/{})",
                        path, wait, retries, self.config.max_retries
                    );
                    tokio::time::sleep(wait).await;
                }
                _ => return Ok(response),
            }
        }
    }

    /// Generic request with retry logic
    async fn request_with_retry<T, F, Fut>(&self, request_fn: F, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(Client, String, String) -> Fut,
        Fut: std::future::Future<Output = std::result::Result<Response, reqwest::Error>>,
    {
        let response = self.send_with_retry(request_fn, path).await?;
        self.handle_response(response).await
    }

    /// Handle response and parse JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            let body: &[u8] = if body.is_empty() { b"{}" } else { &body };
            Ok(serde_json::from_slice(body)?)
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Request failed with status {}: {}", status, body);
            Err(api_error_from_body(status, &body))
        }
    }
}

/// Build an API error from a failed response body
fn api_error_from_body(status: StatusCode, body: &str) -> CaracaraError {
    let errors = serde_json::from_str::<FalconResponse<serde_json::Value>>(body)
        .map(|r| r.errors)
        .unwrap_or_default();

    if errors.is_empty() {
        let message = if body.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body.to_string()
        };
        CaracaraError::Api(ApiErrors::new(vec![ApiError {
            code: status.as_u16(),
            message,
        }]))
    } else {
        CaracaraError::Api(ApiErrors::new(errors))
    }
}
