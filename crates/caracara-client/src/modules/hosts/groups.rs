//! Host group management

use std::collections::BTreeMap;

use caracara_filters::Fql;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::HostsApiModule;
use crate::batching::batch_get_data;
use crate::constants::{DEVICE_ACTION_BATCH_SIZE, HOST_GROUP_SCROLL_BATCH_SIZE, PAGINATION_LIMIT};
use crate::error::{CaracaraError, Result};
use crate::model::{
    ActionParameter, FalconResponse, Record, StringList, Target, ids_query, record_str,
};
use crate::pagination::all_pages_numbered_offset_parallel;

const DEFAULT_GROUP_DESCRIPTION: &str = "Grouped collection of hosts";

/// Outcome of ungrouping a single host group
#[derive(Clone, Debug, Default)]
pub struct UngroupResult {
    /// Result of removing the members, when the group had any
    pub result: Option<Vec<Record>>,
    /// Whether the group itself was deleted
    pub removed: bool,
}

#[derive(Serialize)]
struct NumberedQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    offset: u64,
    limit: u64,
}

#[derive(Serialize)]
struct GroupResource<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignment_rule: Option<&'a str>,
}

#[derive(Serialize)]
struct ResourcesBody<'a> {
    resources: [GroupResource<'a>; 1],
}

/// FQL selecting a list of devices for a group action
fn device_id_filter(device_ids: &[String]) -> String {
    let quoted: Vec<String> = device_ids.iter().map(|id| format!("'{id}'")).collect();
    format!("(device_id:[{}])", quoted.join(","))
}

impl HostsApiModule {
    // ============== Group Queries ==============

    /// Return the ID of every host group matching the filter.
    ///
    /// Fails with [`CaracaraError::HostGroupNotFound`] when nothing matches.
    pub async fn get_group_ids(&self, filters: impl Into<Fql>) -> Result<Vec<String>> {
        let fql = filters.into();
        info!("Searching for host group IDs using the filter string {}", fql);

        let filter = fql.as_deref();
        let ids: Vec<String> = all_pages_numbered_offset_parallel(
            |offset, limit| async move {
                self.http
                    .get_with_query(
                        "/devices/queries/host-groups/v1",
                        &NumberedQuery {
                            filter,
                            id: None,
                            offset,
                            limit,
                        },
                    )
                    .await
            },
            HOST_GROUP_SCROLL_BATCH_SIZE,
        )
        .await?;

        if ids.is_empty() {
            return Err(CaracaraError::HostGroupNotFound);
        }
        Ok(ids)
    }

    /// Return details for every host group matching the filter
    pub async fn describe_groups(&self, filters: impl Into<Fql>) -> Result<BTreeMap<String, Record>> {
        let fql = filters.into();
        info!("Describing host groups according to the filter string {}", fql);

        let group_ids = self.get_group_ids(&fql).await?;
        batch_get_data(&group_ids, |ids| async move {
            self.http
                .get_with_query("/devices/entities/host-groups/v1", &ids_query(&ids))
                .await
        })
        .await
    }

    /// Return the device ID of every member of a host group
    pub async fn get_group_member_ids(&self, group_id: &str) -> Result<Vec<String>> {
        info!("Searching for host group members using the group ID {}", group_id);

        all_pages_numbered_offset_parallel(
            |offset, limit| async move {
                self.http
                    .get_with_query(
                        "/devices/queries/host-group-members/v1",
                        &NumberedQuery {
                            filter: None,
                            id: Some(group_id),
                            offset,
                            limit,
                        },
                    )
                    .await
            },
            HOST_GROUP_SCROLL_BATCH_SIZE,
        )
        .await
    }

    /// Return member device IDs for every host group matching the filter
    pub async fn describe_group_member_ids(
        &self,
        filters: impl Into<Fql>,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let fql = filters.into();
        info!("Describing host group members according to the filter string {}", fql);

        let mut members = BTreeMap::new();
        for group_id in self.get_group_ids(&fql).await? {
            let ids = self.get_group_member_ids(&group_id).await?;
            members.insert(group_id, ids);
        }
        Ok(members)
    }

    /// Return every host group matching the filter with a `devices` list
    /// holding the full record of each member
    pub async fn get_group_members(
        &self,
        filters: impl Into<Fql>,
    ) -> Result<BTreeMap<String, Record>> {
        let mut groups = self.describe_groups(filters).await?;

        for (group_id, group) in groups.iter_mut() {
            let group_id = group_id.as_str();
            let devices: Vec<Value> = all_pages_numbered_offset_parallel(
                |offset, limit| async move {
                    let response: FalconResponse<Vec<Value>> = self
                        .http
                        .get_with_query(
                            "/devices/combined/host-group-members/v1",
                            &NumberedQuery {
                                filter: None,
                                id: Some(group_id),
                                offset,
                                limit,
                            },
                        )
                        .await?;
                    Ok(response)
                },
                PAGINATION_LIMIT,
            )
            .await?;

            info!("Host group {} has {} members", group_id, devices.len());
            group.insert("devices".to_string(), Value::Array(devices));
        }

        Ok(groups)
    }

    /// Same as [`HostsApiModule::get_group_members`]
    pub async fn describe_group_members(
        &self,
        filters: impl Into<Fql>,
    ) -> Result<BTreeMap<String, Record>> {
        let fql = filters.into();
        info!("Describing host group members according to the filter string {}", fql);
        self.get_group_members(fql).await
    }

    // ============== Group Changes ==============

    /// Create a host group. `group_type` defaults to `static`.
    pub async fn create_group(
        &self,
        group_name: &str,
        description: Option<&str>,
        group_type: Option<&str>,
        assignment_rule: Option<&str>,
    ) -> Result<Vec<Record>> {
        if group_name.is_empty() {
            return Err(CaracaraError::MissingArgument("group_name".to_string()));
        }
        let group_type = group_type.unwrap_or_else(|| {
            info!("Group type not specified for creation, defaulting to static.");
            "static"
        });

        info!("Creating {} host group {}", group_type, group_name);

        let response: FalconResponse<Vec<Record>> = self
            .http
            .post_json(
                "/devices/entities/host-groups/v1",
                &ResourcesBody {
                    resources: [GroupResource {
                        id: None,
                        name: Some(group_name),
                        description,
                        group_type: Some(group_type),
                        assignment_rule,
                    }],
                },
            )
            .await?;
        Ok(response.into_result()?.resources)
    }

    /// Delete host groups by ID or by group filter; returns the deleted IDs
    pub async fn delete_group(&self, groups: Target) -> Result<Vec<String>> {
        let group_ids = self.resolve_group_target(groups).await?;
        info!("Deleting {} host groups", group_ids.len());

        let response: FalconResponse<Vec<String>> = self
            .http
            .delete_with_query("/devices/entities/host-groups/v1", &ids_query(&group_ids))
            .await?;
        Ok(response.into_result()?.resources)
    }

    /// Change the name, description or assignment rule of a host group
    pub async fn update_group(
        &self,
        group_id: &str,
        group_name: Option<&str>,
        description: Option<&str>,
        assignment_rule: Option<&str>,
    ) -> Result<Vec<Record>> {
        if group_id.is_empty() {
            return Err(CaracaraError::MissingArgument("group_id".to_string()));
        }
        if group_name.is_none() && description.is_none() && assignment_rule.is_none() {
            return Err(CaracaraError::MissingArguments(vec![
                "group_name".to_string(),
                "group_description".to_string(),
                "assignment_rule".to_string(),
            ]));
        }

        let response: FalconResponse<Vec<Record>> = self
            .http
            .patch_json(
                "/devices/entities/host-groups/v1",
                &ResourcesBody {
                    resources: [GroupResource {
                        id: Some(group_id),
                        name: group_name,
                        description,
                        group_type: None,
                        assignment_rule,
                    }],
                },
            )
            .await?;
        Ok(response.into_result()?.resources)
    }

    // ============== Group Membership ==============

    /// Add devices to host groups
    pub async fn add_to_group(&self, groups: Target, devices: Target) -> Result<Vec<Record>> {
        self.change_membership("add-hosts", groups, devices).await
    }

    /// Remove devices from host groups
    pub async fn remove_from_group(&self, groups: Target, devices: Target) -> Result<Vec<Record>> {
        self.change_membership("remove-hosts", groups, devices).await
    }

    /// Create a static host group holding the given devices
    pub async fn group(
        &self,
        group_name: &str,
        description: Option<&str>,
        assignment_rule: Option<&str>,
        device_ids: impl Into<StringList>,
    ) -> Result<Vec<Record>> {
        let device_ids = device_ids.into();
        if device_ids.is_empty() {
            return Err(CaracaraError::MissingArgument("device_ids".to_string()));
        }

        let description = description.unwrap_or(DEFAULT_GROUP_DESCRIPTION);
        let created = self
            .create_group(group_name, Some(description), Some("static"), assignment_rule)
            .await?;
        let group_id = created
            .first()
            .and_then(|group| record_str(group, "id"))
            .ok_or_else(|| CaracaraError::MissingArgument("id".to_string()))?
            .to_string();

        self.add_to_group(Target::ids(vec![group_id]), Target::Ids(device_ids))
            .await
    }

    /// Remove every member from host groups, optionally deleting the groups
    pub async fn ungroup(
        &self,
        group_ids: impl Into<StringList>,
        remove_groups: bool,
    ) -> Result<BTreeMap<String, UngroupResult>> {
        let group_ids = group_ids.into();
        if group_ids.is_empty() {
            return Err(CaracaraError::MissingArgument("group_ids".to_string()));
        }

        let mut results = BTreeMap::new();
        for group_id in group_ids.into_vec() {
            let mut outcome = UngroupResult::default();

            let members = self.get_group_member_ids(&group_id).await?;
            if !members.is_empty() {
                let removed = self
                    .remove_from_group(Target::ids(vec![group_id.clone()]), Target::ids(members))
                    .await?;
                info!("Removed {} members from group {}", removed.len(), group_id);
                outcome.result = Some(removed);
            }

            if remove_groups {
                info!("Removing group {}", group_id);
                let deleted = self.delete_group(Target::ids(vec![group_id.clone()])).await?;
                outcome.removed = !deleted.is_empty();
            }

            results.insert(group_id, outcome);
        }

        Ok(results)
    }

    async fn change_membership(
        &self,
        action_name: &str,
        groups: Target,
        devices: Target,
    ) -> Result<Vec<Record>> {
        if groups.is_empty() || devices.is_empty() {
            return Err(CaracaraError::MustProvideFilterOrId);
        }

        let group_ids = self.resolve_group_target(groups).await?;
        let device_ids = match devices {
            Target::Ids(ids) => ids.into_vec(),
            Target::Filter(fql) => self.get_device_ids(fql).await?,
        };

        self.perform_group_action(action_name, &group_ids, &device_ids)
            .await
    }

    async fn resolve_group_target(&self, groups: Target) -> Result<Vec<String>> {
        if groups.is_empty() {
            return Err(CaracaraError::MustProvideFilterOrId);
        }
        match groups {
            Target::Ids(ids) => Ok(ids.into_vec()),
            Target::Filter(fql) => self.get_group_ids(fql).await,
        }
    }

    async fn perform_group_action(
        &self,
        action_name: &str,
        group_ids: &[String],
        device_ids: &[String],
    ) -> Result<Vec<Record>> {
        #[derive(Serialize)]
        struct Query<'a> {
            action_name: &'a str,
        }

        #[derive(Serialize)]
        struct Body<'a> {
            ids: &'a [String],
            action_parameters: Vec<ActionParameter>,
        }

        if device_ids.is_empty() {
            return Err(CaracaraError::DeviceNotFound);
        }

        info!(
            "Performing group action {} on {} groups with {} devices",
            action_name,
            group_ids.len(),
            device_ids.len()
        );

        let mut results = Vec::new();
        for batch in device_ids.chunks(DEVICE_ACTION_BATCH_SIZE) {
            let response: FalconResponse<Vec<Record>> = self
                .http
                .post_json_with_query(
                    "/devices/entities/host-group-actions/v1",
                    &Query { action_name },
                    &Body {
                        ids: group_ids,
                        action_parameters: vec![ActionParameter::new(
                            "filter",
                            device_id_filter(batch),
                        )],
                    },
                )
                .await?;
            results.extend(response.into_result()?.resources);
        }
        Ok(results)
    }
}
