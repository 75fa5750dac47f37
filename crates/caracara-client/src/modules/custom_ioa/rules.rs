//! IOA rule groups and custom IOA rules
//!
//! An [`IoaRuleGroup`] owns its [`CustomIoaRule`]s. Rules are built from a
//! [`RuleType`], given an action with [`CustomIoaRule::set_action`] and
//! narrowed with the excludable and set field setters before being added to a
//! group. The `dump_*` methods produce the bodies of the create and update
//! endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};

use super::rule_types::{
    EXCLUDABLE_FIELD, FieldOption, MATCH_ANYTHING, RuleField, RuleType, RuleTypeField, SET_FIELD,
};
use crate::error::{CaracaraError, Result};

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn required_str(data: &Value, key: &str, kind: &str) -> Result<String> {
    str_field(data, key)
        .ok_or_else(|| CaracaraError::InvalidIoa(format!("{kind} has no {key}")))
}

/// Action to give a rule, by disposition ID or by label
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleAction {
    Id(i64),
    Label(String),
}

impl From<i64> for RuleAction {
    fn from(id: i64) -> Self {
        RuleAction::Id(id)
    }
}

impl From<&str> for RuleAction {
    fn from(label: &str) -> Self {
        RuleAction::Label(label.to_string())
    }
}

impl From<String> for RuleAction {
    fn from(label: String) -> Self {
        RuleAction::Label(label)
    }
}

// ============== Rules ==============

/// A custom IOA rule
#[derive(Clone, Debug, PartialEq)]
pub struct CustomIoaRule {
    pub name: String,
    pub description: String,
    /// Typically informational, low, medium, high or critical
    pub severity: String,
    pub rule_type: Arc<RuleType>,
    fields: Vec<RuleField>,
    in_group: bool,

    pub rulegroup_id: Option<String>,
    pub instance_id: Option<String>,
    pub action_label: Option<String>,
    pub disposition_id: Option<i64>,
    pub comment: Option<String>,
    pub committed_on: Option<String>,
    pub created_by: Option<String>,
    pub created_on: Option<String>,
    pub customer_id: Option<String>,
    pub deleted: Option<bool>,
    pub enabled: Option<bool>,
    pub instance_version: Option<i64>,
    pub magic_cookie: Option<i64>,
    pub modified_by: Option<String>,
    pub modified_on: Option<String>,
    pub pattern_id: Option<String>,
    pub version_ids: Option<Value>,
}

impl CustomIoaRule {
    /// A local rule with every field of the rule type at its default
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        severity: impl Into<String>,
        rule_type: Arc<RuleType>,
    ) -> Result<Self> {
        let fields = rule_type
            .fields
            .iter()
            .map(|field| field.to_concrete_field())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.into(),
            description: description.into(),
            severity: severity.into(),
            rule_type,
            fields,
            in_group: false,
            rulegroup_id: None,
            instance_id: None,
            action_label: None,
            disposition_id: None,
            comment: None,
            committed_on: None,
            created_by: None,
            created_on: None,
            customer_id: None,
            deleted: None,
            enabled: None,
            instance_version: None,
            magic_cookie: None,
            modified_by: None,
            modified_on: None,
            pattern_id: None,
            version_ids: None,
        })
    }

    /// Build a rule from its API representation
    pub fn from_value(data: &Value, rule_type: Arc<RuleType>) -> Result<Self> {
        let fields: Vec<RuleField> = match data.get("field_values") {
            Some(Value::Null) | None => Vec::new(),
            Some(values) => serde_json::from_value(values.clone())?,
        };

        let mut rule = Self::new(
            required_str(data, "name", "rule")?,
            str_field(data, "description").unwrap_or_default(),
            required_str(data, "pattern_severity", "rule")?,
            rule_type,
        )?;
        rule.fields = fields;
        rule.rulegroup_id = str_field(data, "rulegroup_id");
        rule.instance_id = str_field(data, "instance_id");
        rule.action_label = str_field(data, "action_label");
        rule.disposition_id = data.get("disposition_id").and_then(Value::as_i64);
        rule.comment = str_field(data, "comment");
        rule.committed_on = str_field(data, "committed_on");
        rule.created_by = str_field(data, "created_by");
        rule.created_on = str_field(data, "created_on");
        rule.customer_id = str_field(data, "customer_id");
        rule.deleted = data.get("deleted").and_then(Value::as_bool);
        rule.enabled = data.get("enabled").and_then(Value::as_bool);
        rule.instance_version = data.get("instance_version").and_then(Value::as_i64);
        rule.magic_cookie = data.get("magic_cookie").and_then(Value::as_i64);
        rule.modified_by = str_field(data, "modified_by");
        rule.modified_on = str_field(data, "modified_on");
        rule.pattern_id = str_field(data, "pattern_id");
        rule.version_ids = data.get("version_ids").filter(|v| !v.is_null()).cloned();
        Ok(rule)
    }

    pub fn exists_in_cloud(&self) -> bool {
        self.instance_id.is_some()
    }

    pub fn fields(&self) -> &[RuleField] {
        &self.fields
    }

    /// Catch rules the API would reject before sending them
    pub fn validation(&self) -> Result<()> {
        if self.disposition_id.is_none() {
            return Err(CaracaraError::InvalidIoa(format!(
                "rule {:?} has no action, set one with set_action",
                self.name
            )));
        }

        let mut regexes = self
            .fields
            .iter()
            .filter(|field| field.field_type == EXCLUDABLE_FIELD)
            .flat_map(|field| field.values.iter())
            .peekable();
        if regexes.peek().is_some() && regexes.all(|value| value.value == MATCH_ANYTHING) {
            return Err(CaracaraError::InvalidIoa(format!(
                "every excludable field of rule {:?} is {MATCH_ANYTHING:?}, set one with \
                 set_excludable_field",
                self.name
            )));
        }

        Ok(())
    }

    /// Labels accepted by [`CustomIoaRule::set_action`]
    pub fn get_possible_actions(&self) -> Vec<&str> {
        self.rule_type.disposition_map.values().map(String::as_str).collect()
    }

    pub fn set_action(&mut self, action: impl Into<RuleAction>) -> Result<()> {
        let (id, label) = match action.into() {
            RuleAction::Id(id) => match self.rule_type.disposition_map.get(&id) {
                Some(label) => (id, label.clone()),
                None => {
                    return Err(CaracaraError::InvalidIoa(format!(
                        "invalid action/disposition ID {id}"
                    )));
                }
            },
            RuleAction::Label(label) => {
                match self
                    .rule_type
                    .disposition_map
                    .iter()
                    .find(|(_, l)| **l == label)
                {
                    Some((id, _)) => (*id, label),
                    None => {
                        return Err(CaracaraError::InvalidIoa(format!(
                            "invalid action/disposition label {label:?}"
                        )));
                    }
                }
            }
        };

        self.disposition_id = Some(id);
        self.action_label = Some(label);
        Ok(())
    }

    fn set_field(&mut self, field: RuleField) {
        match self
            .fields
            .iter_mut()
            .find(|f| f.name == field.name && f.field_type == field.field_type)
        {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Set the include regex, and optionally an exclude regex, of an
    /// excludable field
    pub fn set_excludable_field(
        &mut self,
        name_or_label: &str,
        include: &str,
        exclude: Option<&str>,
    ) -> Result<()> {
        let field = self.type_field(name_or_label, EXCLUDABLE_FIELD)?;

        let mut values = vec![FieldOption::new("include", include)];
        if let Some(exclude) = exclude {
            values.push(FieldOption::new("exclude", exclude));
        }

        self.set_field(RuleField {
            name: field.name,
            label: field.label,
            field_type: field.field_type,
            values,
        });
        Ok(())
    }

    /// Option values of a set field
    pub fn get_set_field_options(&self, name_or_label: &str) -> Result<Vec<String>> {
        let field = self.type_field(name_or_label, SET_FIELD)?;
        Ok(field.options.into_iter().map(|option| option.value).collect())
    }

    /// Select options of a set field, by label or value
    pub fn set_set_field(&mut self, name_or_label: &str, selected_options: &[&str]) -> Result<()> {
        let field = self.type_field(name_or_label, SET_FIELD)?;

        let values = selected_options
            .iter()
            .map(|selected| {
                field
                    .options
                    .iter()
                    .find(|option| option.label == *selected || option.value == *selected)
                    .cloned()
                    .ok_or_else(|| {
                        CaracaraError::InvalidIoa(format!(
                            "no option matching {selected:?} in set field {:?}",
                            field.name
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        self.set_field(RuleField {
            name: field.name.clone(),
            label: field.label.clone(),
            field_type: field.field_type.clone(),
            values,
        });
        Ok(())
    }

    fn type_field(&self, name_or_label: &str, field_type: &str) -> Result<RuleTypeField> {
        self.rule_type
            .get_field(name_or_label, Some(field_type))
            .cloned()
            .ok_or_else(|| {
                CaracaraError::InvalidIoa(format!(
                    "rule type {:?} has no {field_type} field named {name_or_label:?}",
                    self.rule_type.name
                ))
            })
    }

    pub fn dump(&self) -> Value {
        json!({
            "customer_id": self.customer_id,
            "instance_id": self.instance_id,
            "name": self.name,
            "description": self.description,
            "pattern_id": self.pattern_id,
            "pattern_severity": self.severity,
            "disposition_id": self.disposition_id,
            "action_label": self.action_label,
            "ruletype_id": self.rule_type.id,
            "ruletype_name": self.rule_type.name,
            "field_values": self.fields,
            "enabled": self.enabled,
            "deleted": self.deleted,
            "instance_version": self.instance_version,
            "version_ids": self.version_ids,
            "magic_cookie": self.magic_cookie,
            "committed_on": self.committed_on,
            "created_on": self.created_on,
            "created_by": self.created_by,
            "modified_on": self.modified_on,
            "modified_by": self.modified_by,
            "comment": self.comment,
        })
    }

    /// Body of a rule update. With `verify`, the rule must already exist
    /// and pass [`CustomIoaRule::validation`].
    pub fn dump_update(&self, verify: bool) -> Result<Value> {
        if verify {
            if !self.exists_in_cloud() {
                return Err(CaracaraError::InvalidIoa(format!(
                    "rule {:?} has not been created in the cloud",
                    self.name
                )));
            }
            self.validation()?;
        }

        Ok(json!({
            "name": self.name,
            "description": self.description,
            "enabled": self.enabled,
            "instance_id": self.instance_id,
            "pattern_severity": self.severity,
            "disposition_id": self.disposition_id,
            "field_values": self.fields,
        }))
    }

    /// Body of a rule creation. With `verify`, the rule must not exist yet
    /// and must pass [`CustomIoaRule::validation`].
    pub fn dump_create(&self, comment: &str, verify: bool) -> Result<Value> {
        if verify {
            if self.exists_in_cloud() {
                return Err(CaracaraError::InvalidIoa(format!(
                    "rule {:?} already exists in the cloud",
                    self.name
                )));
            }
            self.validation()?;
        }

        Ok(json!({
            "name": self.name,
            "description": self.description,
            "pattern_severity": self.severity,
            "disposition_id": self.disposition_id,
            "field_values": self.fields,
            "rulegroup_id": self.rulegroup_id,
            "ruletype_id": self.rule_type.id,
            "comment": comment,
        }))
    }
}

// ============== Rule Groups ==============

/// A group of custom IOA rules, assignable to host groups
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IoaRuleGroup {
    pub name: String,
    pub description: String,
    /// Typically windows, linux or mac
    pub platform: String,
    pub rules: Vec<CustomIoaRule>,
    /// Cloud rules removed locally, to delete on the next update
    pub rules_to_delete: Vec<CustomIoaRule>,

    pub id: Option<String>,
    pub comment: Option<String>,
    pub committed_on: Option<String>,
    pub created_by: Option<String>,
    pub created_on: Option<String>,
    pub customer_id: Option<String>,
    pub deleted: Option<bool>,
    pub enabled: Option<bool>,
    pub modified_by: Option<String>,
    pub modified_on: Option<String>,
    pub rule_ids: Vec<String>,
    pub version: Option<i64>,
}

impl IoaRuleGroup {
    /// A local, empty rule group
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            platform: platform.into(),
            ..Default::default()
        }
    }

    /// Build a rule group from its API representation. Every rule's type
    /// must be present in `rule_types`, keyed by rule type ID.
    pub fn from_value(data: &Value, rule_types: &HashMap<String, Arc<RuleType>>) -> Result<Self> {
        let mut group = Self::new(
            required_str(data, "name", "rule group")?,
            str_field(data, "description").unwrap_or_default(),
            required_str(data, "platform", "rule group")?,
        );
        group.id = str_field(data, "id");
        group.comment = str_field(data, "comment");
        group.committed_on = str_field(data, "committed_on");
        group.created_by = str_field(data, "created_by");
        group.created_on = str_field(data, "created_on");
        group.customer_id = str_field(data, "customer_id");
        group.deleted = data.get("deleted").and_then(Value::as_bool);
        group.enabled = data.get("enabled").and_then(Value::as_bool);
        group.modified_by = str_field(data, "modified_by");
        group.modified_on = str_field(data, "modified_on");
        group.version = data.get("version").and_then(Value::as_i64);
        group.rule_ids = data
            .get("rule_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        for raw_rule in data.get("rules").and_then(Value::as_array).into_iter().flatten() {
            let ruletype_id = required_str(raw_rule, "ruletype_id", "rule")?;
            let rule_type = rule_types.get(&ruletype_id).cloned().ok_or_else(|| {
                CaracaraError::InvalidIoa(format!("unknown rule type {ruletype_id}"))
            })?;

            let mut rule = CustomIoaRule::from_value(raw_rule, rule_type)?;
            // The API leaves rulegroup_id unset on nested rules
            rule.rulegroup_id = group.id.clone();
            rule.in_group = true;
            group.rules.push(rule);
        }

        Ok(group)
    }

    pub fn exists_in_cloud(&self) -> bool {
        self.id.is_some()
    }

    /// Queue a rule for creation with this group. A rule can only belong to
    /// one group.
    pub fn add_rule(&mut self, mut rule: CustomIoaRule) -> Result<()> {
        if rule.in_group {
            return Err(CaracaraError::InvalidIoa(format!(
                "rule {:?} has already been added to a group",
                rule.name
            )));
        }
        rule.in_group = true;
        rule.rulegroup_id = self.id.clone();
        self.rules.push(rule);
        Ok(())
    }

    /// Remove a rule by index; rules that exist in the cloud are queued for
    /// deletion
    pub fn remove_rule(&mut self, index: usize) -> Result<CustomIoaRule> {
        if index >= self.rules.len() {
            return Err(CaracaraError::InvalidIoa(format!(
                "rule index {index} out of range ({} rules)",
                self.rules.len()
            )));
        }

        let removed = self.rules.remove(index);
        if removed.exists_in_cloud() {
            self.rules_to_delete.push(removed.clone());
        }
        Ok(removed)
    }

    pub fn validation(&self) -> Result<()> {
        self.rules.iter().try_for_each(CustomIoaRule::validation)
    }

    /// Full API representation; the group must exist in the cloud
    pub fn dump(&self) -> Result<Value> {
        self.require_cloud()?;
        Ok(json!({
            "customer_id": self.customer_id,
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "platform": self.platform,
            "enabled": self.enabled,
            "deleted": self.deleted,
            "rule_ids": self.rules.iter().map(|r| r.instance_id.clone()).collect::<Vec<_>>(),
            "rules": self.rules.iter().map(CustomIoaRule::dump).collect::<Vec<_>>(),
            "version": self.version,
            "committed_on": self.committed_on,
            "created_on": self.created_on,
            "created_by": self.created_by,
            "modified_on": self.modified_on,
            "modified_by": self.modified_by,
            "comment": self.comment,
        }))
    }

    pub fn dump_create(&self, comment: &str, verify: bool) -> Result<Value> {
        if verify && self.exists_in_cloud() {
            return Err(CaracaraError::InvalidIoa(format!(
                "rule group {:?} already exists in the cloud",
                self.name
            )));
        }

        Ok(json!({
            "name": self.name,
            "description": self.description,
            "platform": self.platform,
            "comment": comment,
        }))
    }

    pub fn dump_update(&self, comment: &str, verify: bool) -> Result<Value> {
        if verify {
            self.require_cloud()?;
        }

        Ok(json!({
            "id": self.id,
            "rulegroup_version": self.version,
            "name": self.name,
            "description": self.description,
            "enabled": self.enabled,
            "comment": comment,
        }))
    }

    /// Body updating every rule of the group that already exists in the
    /// cloud. Rules not created yet go through [`CustomIoaRule::dump_create`].
    pub fn dump_rules_update(&self, comment: &str) -> Result<Value> {
        self.require_cloud()?;

        let rule_updates = self
            .rules
            .iter()
            .filter(|rule| rule.exists_in_cloud())
            .map(|rule| rule.dump_update(true))
            .collect::<Result<Vec<_>>>()?;

        Ok(json!({
            "comment": comment,
            "rule_updates": rule_updates,
            "rulegroup_version": self.version.unwrap_or_default() + 1,
            "rulegroup_id": self.id,
        }))
    }

    fn require_cloud(&self) -> Result<()> {
        if self.exists_in_cloud() {
            Ok(())
        } else {
            Err(CaracaraError::InvalidIoa(format!(
                "rule group {:?} does not exist in the cloud",
                self.name
            )))
        }
    }
}
