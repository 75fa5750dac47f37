//! User Management API
//!
//! List, create and delete users, and grant them roles.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use caracara_filters::Fql;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::sensor_download::SensorDownloadApiModule;
use crate::batching::{batch_get_data, parallel_list_execution};
use crate::constants::DATA_BATCH_SIZE;
use crate::error::{ApiErrors, CaracaraError, Result};
use crate::http::FalconHttpClient;
use crate::model::{FalconResponse, IdsBody, Record, ids_query, into_record};
use crate::pagination::all_pages_numbered_offset_parallel;

/// A role granted to a user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleGrant {
    pub uuid: String,
    pub role_id: String,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub grant_type: Option<String>,
}

/// Describe, create, delete and edit users in a Falcon tenant
pub struct UsersApiModule {
    http: Arc<FalconHttpClient>,
    sensor_download: Arc<SensorDownloadApiModule>,
}

impl UsersApiModule {
    pub const NAME: &'static str = "CrowdStrike User Management API Module";

    pub fn new(http: Arc<FalconHttpClient>, sensor_download: Arc<SensorDownloadApiModule>) -> Self {
        debug!("Configuring the User Management API");
        Self {
            http,
            sensor_download,
        }
    }

    // ============== Users ==============

    /// UUIDs of every user matching the filter
    pub async fn get_user_uuids(&self, filters: impl Into<Fql>) -> Result<Vec<String>> {
        #[derive(Serialize)]
        struct Query<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            filter: Option<&'a str>,
            offset: u64,
            limit: u64,
        }

        let fql = filters.into();
        info!("Obtaining a list of all users in the Falcon tenant");

        let filter = fql.as_deref();
        all_pages_numbered_offset_parallel(
            |offset, limit| async move {
                let response: FalconResponse<Vec<String>> = self
                    .http
                    .get_with_query(
                        "/user-management/queries/users/v1",
                        &Query {
                            filter,
                            offset,
                            limit,
                        },
                    )
                    .await?;
                Ok(response)
            },
            DATA_BATCH_SIZE as u64,
        )
        .await
    }

    /// User details keyed by UUID
    pub async fn get_user_data(&self, user_uuids: &[String]) -> Result<BTreeMap<String, Record>> {
        info!("Obtaining data for the {} User IDs provided", user_uuids.len());
        batch_get_data(user_uuids, |ids| async move {
            self.http
                .post_json("/user-management/entities/users/GET/v1", &IdsBody { ids: &ids })
                .await
        })
        .await
    }

    /// Describe users, each with a sorted `roles` list.
    ///
    /// When `user_uuids` is given the filter is ignored.
    pub async fn describe_users(
        &self,
        filters: impl Into<Fql>,
        user_uuids: Option<&[String]>,
    ) -> Result<BTreeMap<String, Record>> {
        info!("Describing users");

        let user_uuids = match user_uuids {
            Some(uuids) if !uuids.is_empty() => uuids.to_vec(),
            _ => self.get_user_uuids(filters).await?,
        };

        let mut user_data = self.get_user_data(&user_uuids).await?;
        let grants = self.get_assigned_user_roles(&user_uuids).await?;

        let mut roles: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for grant in &grants {
            roles
                .entry(grant.uuid.as_str())
                .or_default()
                .insert(grant.role_id.as_str());
        }

        for (uuid, record) in user_data.iter_mut() {
            let user_roles: Vec<Value> = roles
                .get(uuid.as_str())
                .map(|r| r.iter().map(|role| Value::from(*role)).collect())
                .unwrap_or_default();
            record.insert("roles".to_string(), Value::Array(user_roles));
        }

        Ok(user_data)
    }

    /// Create a user and return its record
    pub async fn add_user(&self, first_name: &str, last_name: &str, email_address: &str) -> Result<Record> {
        #[derive(Serialize)]
        struct Body<'a> {
            first_name: &'a str,
            last_name: &'a str,
            uid: &'a str,
        }

        info!("Creating a new user, {}", email_address);
        let response: FalconResponse<Vec<Value>> = self
            .http
            .post_json(
                "/user-management/entities/users/v1",
                &Body {
                    first_name,
                    last_name,
                    uid: email_address,
                },
            )
            .await?;

        match response.resources.into_iter().next() {
            Some(user) => into_record(user),
            None if response.errors.is_empty() => Err(CaracaraError::InvalidArgument(format!(
                "the API did not return a record for the new user {email_address}"
            ))),
            None => Err(CaracaraError::Api(ApiErrors::new(response.errors))),
        }
    }

    /// Permanently delete a user. Returns whether the deletion succeeded.
    pub async fn delete_user(&self, uuid: &str) -> Result<bool> {
        #[derive(Serialize)]
        struct Query<'a> {
            user_uuid: &'a str,
        }

        warn!("Permanently deleting user with UUID {}", uuid);
        let result: Result<FalconResponse<Value>> = self
            .http
            .delete_with_query("/user-management/entities/users/v1", &Query { user_uuid: uuid })
            .await;

        match result {
            Ok(response) => Ok(response.errors.is_empty()),
            Err(CaracaraError::Api(errors)) => {
                info!("Failed to delete user {}: {}", uuid, errors);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_uuid_by_email(&self, email: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Query<'a> {
            uid: &'a str,
        }

        info!("Getting UUID");
        let response: FalconResponse<Vec<String>> = self
            .http
            .get_with_query("/users/queries/user-uuids-by-email/v1", &Query { uid: email })
            .await?;

        match response.resources.into_iter().next() {
            Some(uuid) => Ok(uuid),
            None if response.errors.is_empty() => Err(CaracaraError::UserNotFound(email.to_string())),
            None => Err(CaracaraError::Api(ApiErrors::new(response.errors))),
        }
    }

    // ============== Roles ==============

    /// IDs of every role enabled on the tenant
    pub async fn get_available_role_ids(&self) -> Result<Vec<String>> {
        #[derive(Serialize)]
        struct Query {}

        info!("Fetching a list of role IDs");
        let response: FalconResponse<Vec<String>> = self
            .http
            .get_with_query("/user-management/queries/roles/v1", &Query {})
            .await?;
        Ok(response.into_result()?.resources)
    }

    /// Role details keyed by role ID
    pub async fn get_role_information(&self, role_ids: &[String]) -> Result<BTreeMap<String, Record>> {
        info!("Getting information on the {} role IDs provided", role_ids.len());
        batch_get_data(role_ids, |ids| async move {
            self.http
                .get_with_query("/user-management/entities/roles/v1", &ids_query(&ids))
                .await
        })
        .await
    }

    pub async fn describe_available_roles(&self) -> Result<BTreeMap<String, Record>> {
        info!("Describing available roles");
        let role_ids = self.get_available_role_ids().await?;
        self.get_role_information(&role_ids).await
    }

    /// Every role granted to each of the users, directly or via groups
    pub async fn get_assigned_user_roles(&self, user_uuids: &[String]) -> Result<Vec<UserRoleGrant>> {
        #[derive(Serialize)]
        struct Query<'a> {
            user_uuid: &'a str,
            direct_only: bool,
            sort: &'a str,
        }

        info!("Retrieving roles for {} User IDs", user_uuids.len());
        parallel_list_execution(user_uuids.iter().collect(), |user_uuid| async move {
            let response: FalconResponse<Vec<UserRoleGrant>> = self
                .http
                .get_with_query(
                    "/user-management/combined/user-roles/v1",
                    &Query {
                        user_uuid,
                        direct_only: false,
                        sort: "cid",
                    },
                )
                .await?;
            response.into_result()
        })
        .await
    }

    /// Grant roles to a user in the authenticated tenant.
    ///
    /// Needs Sensor Download read access to resolve the tenant CID.
    pub async fn add_user_roles(&self, user_uuid: &str, role_ids: &[String]) -> Result<bool> {
        #[derive(Serialize)]
        struct Body<'a> {
            action: &'a str,
            cid: &'a str,
            role_ids: &'a [String],
            uuid: &'a str,
        }

        info!("Granting roles {:?} to user {}", role_ids, user_uuid);
        let cid = self.sensor_download.get_cid(false).await?;

        let response: FalconResponse<Value> = self
            .http
            .post_json(
                "/user-management/entities/user-role-actions/v1",
                &Body {
                    action: "grant",
                    cid: &cid,
                    role_ids,
                    uuid: user_uuid,
                },
            )
            .await?;
        debug!("{:?}", response);
        Ok(response.errors.is_empty())
    }
}
