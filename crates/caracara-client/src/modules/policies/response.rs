//! Response Policies API

use std::sync::Arc;

use caracara_filters::Fql;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{PolicyEndpoints, SortOrder};
use crate::error::{CaracaraError, Result};
use crate::http::FalconHttpClient;
use crate::model::{ActionParameter, FalconResponse};
use crate::policy::{Policy, PolicyStyle, generate_template};

const ENDPOINTS: PolicyEndpoints = PolicyEndpoints {
    style: PolicyStyle::Response,
    combined: "/policy/combined/response/v1",
    entities: "/policy/entities/response/v1",
};

/// Describe, create and edit Falcon response policies
pub struct ResponsePoliciesApiModule {
    http: Arc<FalconHttpClient>,
}

impl ResponsePoliciesApiModule {
    pub const NAME: &'static str = "CrowdStrike Response Policies API Module";

    pub fn new(http: Arc<FalconHttpClient>) -> Self {
        debug!("Configuring the Response Policies API");
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
        generate_template(PolicyStyle::Response, platform_name)
    }

    /// Create a policy in the Falcon cloud
    pub async fn push_policy(&self, policy: &Policy) -> Result<Policy> {
        info!(
            "Creating the response policy named {}",
            policy.name.as_deref().unwrap_or_default()
        );
        ENDPOINTS.write(&self.http, policy, false).await
    }

    /// Update an existing policy to match `policy`
    pub async fn modify_policy(&self, policy: &Policy) -> Result<Policy> {
        if policy.policy_id.is_none() {
            return Err(CaracaraError::MissingArgument(
                "policy ID; use describe_policies to retrieve a complete policy".to_string(),
            ));
        }

        info!(
            "Updating the response policy named {}",
            policy.name.as_deref().unwrap_or_default()
        );
        ENDPOINTS.write(&self.http, policy, true).await
    }

    /// Assign a policy to a host group and return the updated policy
    pub async fn add_policy_to_group(&self, policy_id: &str, group_id: &str) -> Result<Policy> {
        #[derive(Serialize)]
        struct Query<'a> {
            action_name: &'a str,
        }

        #[derive(Serialize)]
        struct Body<'a> {
            action_parameters: Vec<ActionParameter>,
            ids: [&'a str; 1],
        }

        info!("Adding response policy {} to host group {}", policy_id, group_id);
        let response: FalconResponse<Value> = self
            .http
            .post_json_with_query(
                "/policy/entities/response-actions/v1",
                &Query {
                    action_name: "add-host-group",
                },
                &Body {
                    action_parameters: vec![ActionParameter::new("group_id", group_id)],
                    ids: [policy_id],
                },
            )
            .await?;
        response.into_result()?;

        let filter = format!("id: '{policy_id}'");
        ENDPOINTS
            .describe(&self.http, Some(&filter), SortOrder::Asc)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CaracaraError::InvalidArgument(format!("policy {policy_id} not found")))
    }
}
