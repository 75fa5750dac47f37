//! Prevention and Response Policies APIs
//!
//! Both policy types share the same endpoint layout and model, so the
//! request logic lives here and each module supplies its endpoints.

mod prevention;
mod response;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::constants::PAGINATION_LIMIT;
use crate::error::{ApiErrors, CaracaraError, Result};
use crate::http::FalconHttpClient;
use crate::model::FalconResponse;
use crate::pagination::all_pages_numbered_offset_parallel;
use crate::policy::{Policy, PolicyStyle};

pub use prevention::PreventionPoliciesApiModule;
pub use response::ResponsePoliciesApiModule;

/// Policy ordering by precedence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "precedence|asc",
            SortOrder::Desc => "precedence|desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = CaracaraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" | "precedence|asc" => Ok(SortOrder::Asc),
            "desc" | "precedence|desc" => Ok(SortOrder::Desc),
            other => Err(CaracaraError::InvalidArgument(format!(
                "sort must be asc or desc, not {other}"
            ))),
        }
    }
}

/// Endpoints serving one policy type
struct PolicyEndpoints {
    style: PolicyStyle,
    combined: &'static str,
    entities: &'static str,
}

impl PolicyEndpoints {
    async fn describe_raw(
        &self,
        http: &FalconHttpClient,
        filter: Option<&str>,
        sort: SortOrder,
    ) -> Result<Vec<Value>> {
        #[derive(Serialize)]
        struct Query<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            filter: Option<&'a str>,
            sort: &'a str,
            offset: u64,
            limit: u64,
        }

        info!("Describing all Falcon {} policies", self.style);
        let resources = all_pages_numbered_offset_parallel(
            |offset, limit| async move {
                let response: FalconResponse<Vec<Value>> = http
                    .get_with_query(
                        self.combined,
                        &Query {
                            filter,
                            sort: sort.as_str(),
                            offset,
                            limit,
                        },
                    )
                    .await?;
                response.into_result()
            },
            PAGINATION_LIMIT,
        )
        .await?;
        debug!("{:?}", resources);
        Ok(resources)
    }

    async fn describe(
        &self,
        http: &FalconHttpClient,
        filter: Option<&str>,
        sort: SortOrder,
    ) -> Result<Vec<Policy>> {
        self.describe_raw(http, filter, sort)
            .await?
            .iter()
            .map(|data| Policy::from_value(self.style, data))
            .collect()
    }

    /// POST or PATCH a policy and load the first returned resource
    async fn write(&self, http: &FalconHttpClient, policy: &Policy, update: bool) -> Result<Policy> {
        let body = json!({ "resources": [policy.flat_dump()] });
        let response: FalconResponse<Vec<Value>> = if update {
            http.patch_json(self.entities, &body).await?
        } else {
            http.post_json(self.entities, &body).await?
        };
        self.first_policy(response)
    }

    fn first_policy(&self, response: FalconResponse<Vec<Value>>) -> Result<Policy> {
        match response.resources.first() {
            Some(data) => Policy::from_value(self.style, data),
            None => Err(CaracaraError::Api(ApiErrors::new(response.errors))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order() {
        assert_eq!(SortOrder::default().as_str(), "precedence|asc");
        assert_eq!(SortOrder::Desc.to_string(), "precedence|desc");
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_first_policy_without_resources() {
        let endpoints = PolicyEndpoints {
            style: PolicyStyle::Response,
            combined: "/policy/combined/response/v1",
            entities: "/policy/entities/response/v1",
        };
        let response: FalconResponse<Vec<Value>> = serde_json::from_value(json!({
            "resources": [],
            "errors": [{"code": 400, "message": "name already exists"}]
        }))
        .unwrap();
        let err = endpoints.first_policy(response).unwrap_err();
        assert_eq!(err.code(), 400);
    }
}
