//! Caracara: a friendly SDK for the CrowdStrike Falcon API
//!
//! Features:
//! - OAuth2 authentication with token caching, cloud auto-discovery and
//!   rate limit handling
//! - Automatic pagination and concurrent batch retrieval
//! - FQL filters built from typed attributes (see [`caracara_filters`])
//! - Hosts, host groups, Real Time Response, users, Flight Control, sensor
//!   download, sensor update, prevention and response policy modules
//! - Custom IOA rule group, rule and rule type models
//!
//! ```no_run
//! use caracara_client::{Client, ClientConfig};
//!
//! # async fn run() -> caracara_client::Result<()> {
//! let client = Client::new(ClientConfig::new("${FALCON_CLIENT_ID}", "${FALCON_CLIENT_SECRET}"))?;
//! let devices = client.hosts().describe_devices("platform_name: 'Windows'").await?;
//! println!("{} Windows devices", devices.len());
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod batching;
pub mod client;
pub mod cloud;
pub mod constants;
pub mod error;
pub mod http;
pub mod interpolation;
pub mod model;
pub mod modules;
pub mod pagination;
pub mod policy;

pub use caracara_filters::{Dialect, FalconFilter, Fql, Operator};
pub use client::Client;
pub use cloud::{CloudRegion, CloudTarget};
pub use error::{ApiError, ApiErrors, CaracaraError, Result};
pub use http::{ClientConfig, FalconHttpClient};
pub use interpolation::VariableInterpolator;
pub use model::{FalconResponse, Record, StringList, Target};
pub use modules::custom_ioa::{CustomIoaRule, IoaRuleGroup, RuleAction, RuleType};
pub use modules::hosts::{OnlineState, UngroupResult};
pub use modules::rtr::{BatchGetCmdRequest, GetFile, PermissionLevel, RtrBatchSession};
pub use modules::{
    FlightControlApiModule, HostsApiModule, PreventionPoliciesApiModule,
    ResponsePoliciesApiModule, RtrApiModule, SensorDownloadApiModule,
    SensorUpdatePoliciesApiModule, SortOrder, UsersApiModule,
};
pub use policy::{
    GroupAssignment, Policy, PolicySetting, PolicySettingGroup, PolicyStyle, SettingValue,
};
