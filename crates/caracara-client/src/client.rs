//! Caracara client facade
//!
//! [`Client`] owns the shared HTTP client and exposes one handle per Falcon
//! API area. Credentials may reference environment variables with `${NAME}`.

use std::sync::Arc;

use caracara_filters::{Dialect, FalconFilter};
use tracing::{debug, info};

use crate::error::Result;
use crate::http::{ClientConfig, FalconHttpClient};
use crate::interpolation::VariableInterpolator;
use crate::modules::{
    FlightControlApiModule, HostsApiModule, PreventionPoliciesApiModule,
    ResponsePoliciesApiModule, RtrApiModule, SensorDownloadApiModule,
    SensorUpdatePoliciesApiModule, UsersApiModule,
};

/// Entry point to every Falcon API module
pub struct Client {
    http: Arc<FalconHttpClient>,
    hosts: HostsApiModule,
    rtr: RtrApiModule,
    users: UsersApiModule,
    flight_control: FlightControlApiModule,
    sensor_download: Arc<SensorDownloadApiModule>,
    sensor_update_policies: SensorUpdatePoliciesApiModule,
    prevention_policies: PreventionPoliciesApiModule,
    response_policies: ResponsePoliciesApiModule,
}

impl Client {
    /// Configure a client. No request is made until the first API call.
    pub fn new(config: ClientConfig) -> Result<Self> {
        info!("Setting up the Caracara client");
        let config = interpolate_config(config, &VariableInterpolator::new());

        info!(
            "Client ID: {}; Cloud: {}; Member CID: {:?}",
            config.client_id, config.cloud_name, config.member_cid
        );
        debug!("SSL verification is {}", config.ssl_verify);
        debug!("Timeout: {}s", config.timeout_secs);
        debug!("Configured proxy: {:?}", config.proxy);
        debug!("User agent: {}", config.user_agent);

        let http = Arc::new(FalconHttpClient::new(config)?);
        info!("Base URL: {}", http.base_url());

        let sensor_download = Arc::new(SensorDownloadApiModule::new(Arc::clone(&http)));

        let client = Self {
            hosts: HostsApiModule::new(Arc::clone(&http)),
            rtr: RtrApiModule::new(Arc::clone(&http)),
            users: UsersApiModule::new(Arc::clone(&http), Arc::clone(&sensor_download)),
            flight_control: FlightControlApiModule::new(Arc::clone(&http)),
            sensor_update_policies: SensorUpdatePoliciesApiModule::new(Arc::clone(&http)),
            prevention_policies: PreventionPoliciesApiModule::new(Arc::clone(&http)),
            response_policies: ResponsePoliciesApiModule::new(Arc::clone(&http)),
            sensor_download,
            http,
        };

        info!("Caracara client configured");
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }

    /// Shared HTTP client
    pub fn http(&self) -> &Arc<FalconHttpClient> {
        &self.http
    }

    /// Fetch a token now instead of on the first call
    pub async fn authenticate(&self) -> Result<()> {
        self.http.authenticate().await
    }

    /// New empty filter for the given dialect
    pub fn falcon_filter(&self, dialect: Dialect) -> FalconFilter {
        FalconFilter::new(dialect)
    }

    pub fn hosts(&self) -> &HostsApiModule {
        &self.hosts
    }

    pub fn rtr(&self) -> &RtrApiModule {
        &self.rtr
    }

    pub fn users(&self) -> &UsersApiModule {
        &self.users
    }

    pub fn flight_control(&self) -> &FlightControlApiModule {
        &self.flight_control
    }

    pub fn sensor_download(&self) -> &SensorDownloadApiModule {
        &self.sensor_download
    }

    pub fn sensor_update_policies(&self) -> &SensorUpdatePoliciesApiModule {
        &self.sensor_update_policies
    }

    pub fn prevention_policies(&self) -> &PreventionPoliciesApiModule {
        &self.prevention_policies
    }

    pub fn response_policies(&self) -> &ResponsePoliciesApiModule {
        &self.response_policies
    }

    /// Revoke the API token
    pub async fn close(&self) -> Result<()> {
        info!("Revoking API token");
        self.http.revoke().await
    }
}

fn interpolate_config(mut config: ClientConfig, interpolator: &VariableInterpolator) -> ClientConfig {
    config.client_id = interpolator.interpolate(&config.client_id);
    config.client_secret = interpolator.interpolate(&config.client_secret);
    config.cloud_name = interpolator.interpolate(&config.cloud_name);
    config.member_cid = config.member_cid.map(|cid| interpolator.interpolate(&cid));
    config
}
