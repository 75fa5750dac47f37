//! Policy model shared by prevention and response policies
//!
//! A [`Policy`] holds groups of settings as shown in the Falcon console, plus
//! the host groups the policy is assigned to. [`Policy::dump`] reproduces the
//! API representation, while [`Policy::flat_dump`] produces the reduced body
//! accepted by the create and update endpoints.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::constants::PLATFORMS;
use crate::error::{CaracaraError, Result};

const PREVENTION_TEMPLATE: &str = include_str!("../templates/prevention_policy.json");
const RESPONSE_TEMPLATE: &str = include_str!("../templates/response_policy.json");

/// Kind of policy, which decides where settings live in the API payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyStyle {
    Prevention,
    Response,
}

impl PolicyStyle {
    /// Key holding the settings groups
    pub fn settings_key(&self) -> &'static str {
        match self {
            PolicyStyle::Prevention => "prevention_settings",
            PolicyStyle::Response => "settings",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            PolicyStyle::Prevention => PREVENTION_TEMPLATE,
            PolicyStyle::Response => RESPONSE_TEMPLATE,
        }
    }

    fn example_name(&self) -> &'static str {
        match self {
            PolicyStyle::Prevention => "Example Prevention Policy",
            PolicyStyle::Response => "Example Response Policy",
        }
    }

    fn example_description(&self) -> &'static str {
        match self {
            PolicyStyle::Prevention => "Prevention policy generated from a template",
            PolicyStyle::Response => "Response Policy generated from a template",
        }
    }
}

impl fmt::Display for PolicyStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyStyle::Prevention => f.write_str("prevention"),
            PolicyStyle::Response => f.write_str("response"),
        }
    }
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

// ============== Group Assignments ==============

/// Host group a policy is assigned to
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GroupAssignment {
    pub name: Option<String>,
    pub assignment_rule: Option<String>,
    pub created_by: Option<String>,
    pub created_timestamp: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "id")]
    pub group_id: Option<String>,
    pub group_type: Option<String>,
    pub modified_by: Option<String>,
    pub modified_timestamp: Option<String>,
}

impl GroupAssignment {
    pub fn dump(&self) -> Value {
        json!({
            "assignment_rule": self.assignment_rule,
            "created_by": self.created_by,
            "created_timestamp": self.created_timestamp,
            "description": self.description,
            "group_type": self.group_type,
            "id": self.group_id,
            "modified_by": self.modified_by,
            "modified_timestamp": self.modified_timestamp,
            "name": self.name,
        })
    }

    pub fn flat_dump(&self) -> Value {
        json!({
            "assignment_rule": self.assignment_rule,
            "description": self.description,
            "group_type": self.group_type,
            "id": self.group_id,
            "name": self.name,
        })
    }
}

// ============== Settings ==============

/// Value of a changeable policy setting
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingValue {
    /// Enabled or disabled
    Toggle { enabled: Option<bool> },
    /// Machine learning levels, such as `DISABLED` or `AGGRESSIVE`
    MlSlider {
        detection: Option<String>,
        prevention: Option<String>,
    },
}

impl SettingValue {
    pub fn setting_type(&self) -> &'static str {
        match self {
            SettingValue::Toggle { .. } => "toggle",
            SettingValue::MlSlider { .. } => "mlslider",
        }
    }

    fn dump(&self) -> Value {
        match self {
            SettingValue::Toggle { enabled } => json!({ "enabled": enabled }),
            SettingValue::MlSlider {
                detection,
                prevention,
            } => json!({ "detection": detection, "prevention": prevention }),
        }
    }
}

/// A single changeable setting
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicySetting {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: SettingValue,
}

impl PolicySetting {
    /// Build a setting from its API representation
    pub fn from_value(data: &Value) -> Result<Self> {
        let value = data.get("value").unwrap_or(&Value::Null);
        let setting_value = match data.get("type").and_then(Value::as_str) {
            Some("toggle") => SettingValue::Toggle {
                enabled: value.get("enabled").and_then(Value::as_bool),
            },
            Some("mlslider") => SettingValue::MlSlider {
                detection: str_field(value, "detection"),
                prevention: str_field(value, "prevention"),
            },
            other => {
                return Err(CaracaraError::InvalidArgument(format!(
                    "setting type {} is not yet supported",
                    other.unwrap_or("(none)")
                )));
            }
        };

        Ok(Self {
            id: str_field(data, "id"),
            name: str_field(data, "name"),
            description: str_field(data, "description"),
            value: setting_value,
        })
    }

    pub fn dump(&self) -> Value {
        json!({
            "description": self.description,
            "id": self.id,
            "name": self.name,
            "type": self.value.setting_type(),
            "value": self.value.dump(),
        })
    }

    pub fn flat_dump(&self) -> Value {
        json!({
            "id": self.id,
            "value": self.value.dump(),
        })
    }
}

/// Named group of settings
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicySettingGroup {
    pub name: Option<String>,
    pub settings: Vec<PolicySetting>,
}

impl PolicySettingGroup {
    pub fn from_value(data: &Value) -> Result<Self> {
        let settings = data
            .get("settings")
            .and_then(Value::as_array)
            .map(|settings| settings.iter().map(PolicySetting::from_value).collect())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            name: str_field(data, "name"),
            settings,
        })
    }

    pub fn dump(&self) -> Value {
        json!({
            "name": self.name,
            "settings": self.settings.iter().map(PolicySetting::dump).collect::<Vec<_>>(),
        })
    }

    pub fn flat_dump(&self) -> Value {
        json!({
            "settings": self.settings.iter().map(PolicySetting::flat_dump).collect::<Vec<_>>(),
        })
    }

    /// Find a setting by ID
    pub fn setting_mut(&mut self, setting_id: &str) -> Option<&mut PolicySetting> {
        self.settings
            .iter_mut()
            .find(|s| s.id.as_deref() == Some(setting_id))
    }
}

// ============== Policies ==============

/// A prevention or response policy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policy {
    pub style: PolicyStyle,
    pub policy_id: Option<String>,
    pub cid: Option<String>,
    pub created_by: Option<String>,
    pub created_timestamp: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub modified_by: Option<String>,
    pub modified_timestamp: Option<String>,
    pub name: Option<String>,
    pub platform_name: Option<String>,
    pub groups: Vec<GroupAssignment>,
    pub settings_groups: Vec<PolicySettingGroup>,
}

impl Policy {
    /// An empty policy of the given style
    pub fn new(style: PolicyStyle) -> Self {
        Self {
            style,
            policy_id: None,
            cid: None,
            created_by: None,
            created_timestamp: None,
            description: None,
            enabled: None,
            modified_by: None,
            modified_timestamp: None,
            name: None,
            platform_name: None,
            groups: Vec::new(),
            settings_groups: Vec::new(),
        }
    }

    /// Load a policy from its API representation
    pub fn from_value(style: PolicyStyle, data: &Value) -> Result<Self> {
        let groups = match data.get("groups") {
            Some(Value::Array(groups)) => groups
                .iter()
                .map(|g| GroupAssignment::deserialize(g).map_err(CaracaraError::from))
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        let settings_groups = match data.get(style.settings_key()) {
            Some(Value::Array(groups)) => groups
                .iter()
                .map(PolicySettingGroup::from_value)
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            style,
            policy_id: str_field(data, "id"),
            cid: str_field(data, "cid"),
            created_by: str_field(data, "created_by"),
            created_timestamp: str_field(data, "created_timestamp"),
            description: str_field(data, "description"),
            enabled: data.get("enabled").and_then(Value::as_bool),
            modified_by: str_field(data, "modified_by"),
            modified_timestamp: str_field(data, "modified_timestamp"),
            name: str_field(data, "name"),
            platform_name: str_field(data, "platform_name"),
            groups,
            settings_groups,
        })
    }

    /// Full representation, matching what the API returns
    pub fn dump(&self) -> Value {
        let mut data = json!({
            "cid": self.cid,
            "created_by": self.created_by,
            "created_timestamp": self.created_timestamp,
            "description": self.description,
            "enabled": self.enabled,
            "groups": self.groups.iter().map(GroupAssignment::dump).collect::<Vec<_>>(),
            "id": self.policy_id,
            "modified_by": self.modified_by,
            "modified_timestamp": self.modified_timestamp,
            "name": self.name,
            "platform_name": self.platform_name,
        });
        data[self.style.settings_key()] = Value::Array(
            self.settings_groups
                .iter()
                .map(PolicySettingGroup::dump)
                .collect(),
        );
        data
    }

    /// Body for policy create and update calls, with every setting flattened
    /// into a single list
    pub fn flat_dump(&self) -> Value {
        let settings: Vec<Value> = self
            .settings_groups
            .iter()
            .flat_map(|group| group.settings.iter().map(PolicySetting::flat_dump))
            .collect();

        let mut data = json!({
            "description": self.description,
            "name": self.name,
            "platform_name": self.platform_name,
        });
        data[self.style.settings_key()] = Value::Array(settings);
        if let Some(policy_id) = &self.policy_id {
            data["id"] = Value::String(policy_id.clone());
        }
        data
    }

    /// Find a setting by ID in any group
    pub fn setting_mut(&mut self, setting_id: &str) -> Option<&mut PolicySetting> {
        self.settings_groups
            .iter_mut()
            .find_map(|group| group.setting_mut(setting_id))
    }
}

// ============== Templates ==============

#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateDescription {
    Text(String),
    PerPlatform(BTreeMap<String, String>),
}

#[derive(Deserialize)]
struct TemplateSetting {
    name: String,
    #[serde(rename = "type")]
    setting_type: String,
    description: TemplateDescription,
    value: Value,
}

#[derive(Deserialize)]
struct TemplateGroup {
    name: String,
    settings: Vec<String>,
}

#[derive(Deserialize)]
struct Template {
    settings: BTreeMap<String, TemplateSetting>,
    platforms: BTreeMap<String, Vec<TemplateGroup>>,
}

/// Build a blank policy for a platform with every setting disabled
pub fn generate_template(style: PolicyStyle, platform_name: &str) -> Result<Policy> {
    if !PLATFORMS.contains(&platform_name) {
        return Err(CaracaraError::InvalidPlatform(platform_name.to_string()));
    }

    let template: Template = serde_json::from_str(style.template())?;
    let groups = template
        .platforms
        .get(platform_name)
        .ok_or_else(|| CaracaraError::InvalidPlatform(platform_name.to_string()))?;

    let mut policy = Policy::new(style);
    policy.name = Some(style.example_name().to_string());
    policy.description = Some(style.example_description().to_string());
    policy.platform_name = Some(platform_name.to_string());

    for group in groups {
        let mut settings_group = PolicySettingGroup {
            name: Some(group.name.clone()),
            settings: Vec::new(),
        };

        for setting_id in &group.settings {
            let setting = template.settings.get(setting_id).ok_or_else(|| {
                CaracaraError::InvalidArgument(format!(
                    "{style} template has no setting named {setting_id}"
                ))
            })?;
            let description = match &setting.description {
                TemplateDescription::Text(text) => Some(text.clone()),
                TemplateDescription::PerPlatform(texts) => texts.get(platform_name).cloned(),
            };

            settings_group.settings.push(PolicySetting::from_value(&json!({
                "description": description,
                "id": setting_id,
                "name": setting.name,
                "type": setting.setting_type,
                "value": setting.value,
            }))?);
        }

        policy.settings_groups.push(settings_group);
    }

    Ok(policy)
}
