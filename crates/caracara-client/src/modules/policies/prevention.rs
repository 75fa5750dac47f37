//! Prevention Policies API

use std::sync::Arc;

use caracara_filters::Fql;
use serde_json::Value;
use tracing::{debug, info};

use super::{PolicyEndpoints, SortOrder};
use crate::error::Result;
use crate::http::FalconHttpClient;
use crate::policy::{Policy, PolicyStyle, generate_template};

const ENDPOINTS: PolicyEndpoints = PolicyEndpoints {
    style: PolicyStyle::Prevention,
    combined: "/policy/combined/prevention/v1",
    entities: "/policy/entities/prevention/v1",
};

/// Describe and create Falcon prevention policies
pub struct PreventionPoliciesApiModule {
    http: Arc<FalconHttpClient>,
}

impl PreventionPoliciesApiModule {
    pub const NAME: &'static str = "CrowdStrike Prevention Policies API Module";

    pub fn new(http: Arc<FalconHttpClient>) -> Self {
        debug!("Configuring the Prevention Policies API");
        Self { http }
    }

    /// Policies matching the filter as returned by the API
    pub async fn describe_policies_raw(&self, filters: impl Into<Fql>, sort: SortOrder) -> Result<Vec<Value>> {
        let fql = filters.into();
        ENDPOINTS.describe_raw(&self.http, fql.as_deref(), sort).await
    }

    pub async fn describe_policies(&self, filters: impl Into<Fql>, sort: SortOrder) -> Result<Vec<Policy>> {
        let fql = filters.into();
        ENDPOINTS.describe(&self.http, fql.as_deref(), sort).await
    }

    /// Blank policy for a platform, ready to customise and push
    pub fn new_policy(&self, platform_name: &str) -> Result<Policy> {
        generate_template(PolicyStyle::Prevention, platform_name)
    }

    /// Create a policy in the Falcon cloud
    pub async fn push_policy(&self, policy: &Policy) -> Result<Policy> {
        info!(
            "Creating the prevention policy named {}",
            policy.name.as_deref().unwrap_or_default()
        );
        ENDPOINTS.write(&self.http, policy, false).await
    }
}
