//! Custom IOA rule types
//!
//! A rule type describes what a custom IOA rule can match on: the fields it
//! exposes and the actions (dispositions) it can take.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{CaracaraError, Result};

/// Field type holding include/exclude regular expressions
pub const EXCLUDABLE_FIELD: &str = "excludable";
/// Field type holding a subset of fixed options
pub const SET_FIELD: &str = "set";

/// Regex matching anything, the include value of a fresh excludable field
pub const MATCH_ANYTHING: &str = ".*";

/// A label/value pair, used for field options and for field values
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A field as set on a rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub values: Vec<FieldOption>,
}

/// A field a rule type offers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTypeField {
    pub label: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

impl RuleTypeField {
    /// The field with default values: excludable fields include everything,
    /// set fields select every option
    pub fn to_concrete_field(&self) -> Result<RuleField> {
        let values = match self.field_type.as_str() {
            EXCLUDABLE_FIELD => vec![FieldOption::new("include", MATCH_ANYTHING)],
            SET_FIELD => self.options.clone(),
            other => {
                return Err(CaracaraError::InvalidIoa(format!(
                    "unknown rule field type {other:?}"
                )));
            }
        };

        Ok(RuleField {
            name: self.name.clone(),
            label: self.label.clone(),
            field_type: self.field_type.clone(),
            values,
        })
    }
}

#[derive(Deserialize)]
struct Disposition {
    id: i64,
    label: String,
}

#[derive(Deserialize)]
struct RawRuleType {
    id: String,
    name: String,
    #[serde(default)]
    long_desc: String,
    platform: String,
    #[serde(default)]
    disposition_map: Vec<Disposition>,
    #[serde(default)]
    fields: Vec<RuleTypeField>,
    #[serde(default)]
    released: bool,
    #[serde(default)]
    channel: i64,
}

/// A custom IOA rule type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleType {
    pub id: String,
    pub name: String,
    pub long_desc: String,
    pub platform: String,
    /// Disposition ID to action label
    pub disposition_map: BTreeMap<i64, String>,
    pub fields: Vec<RuleTypeField>,
    pub released: bool,
    pub channel: i64,
}

impl RuleType {
    /// Build a rule type from its API representation
    pub fn from_value(data: &Value) -> Result<Self> {
        let raw: RawRuleType = serde_json::from_value(data.clone())?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            long_desc: raw.long_desc,
            platform: raw.platform,
            disposition_map: raw
                .disposition_map
                .into_iter()
                .map(|d| (d.id, d.label))
                .collect(),
            fields: raw.fields,
            released: raw.released,
            channel: raw.channel,
        })
    }

    /// Find a field by name or label, optionally of a given type
    pub fn get_field(
        &self,
        name_or_label: &str,
        field_type: Option<&str>,
    ) -> Option<&RuleTypeField> {
        self.fields.iter().find(|field| {
            (field.name == name_or_label || field.label == name_or_label)
                && field_type.is_none_or(|t| field.field_type == t)
        })
    }

    pub fn dump(&self) -> Value {
        let disposition_map: Vec<Value> = self
            .disposition_map
            .iter()
            .map(|(id, label)| json!({ "id": id, "label": label }))
            .collect();

        json!({
            "id": self.id,
            "name": self.name,
            "long_desc": self.long_desc,
            "platform": self.platform,
            "disposition_map": disposition_map,
            "fields": self.fields,
            "released": self.released,
            "channel": self.channel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_rule_type() -> Value {
        json!({
            "id": "5",
            "name": "Process Creation",
            "long_desc": "Match processes by image and command line",
            "platform": "windows",
            "disposition_map": [
                {"id": 10, "label": "Monitor"},
                {"id": 30, "label": "Detect"},
                {"id": 20, "label": "Kill Process"}
            ],
            "fields": [
                {"label": "Image Filename", "name": "ImageFilename", "type": "excludable", "options": []},
                {"label": "Command Line", "name": "CommandLine", "type": "excludable", "options": []},
                {
                    "label": "Grandparent Type",
                    "name": "GrandparentType",
                    "type": "set",
                    "options": [
                        {"label": "Service", "value": "svc"},
                        {"label": "Script", "value": "script"}
                    ]
                }
            ],
            "released": true,
            "channel": 0
        })
    }

    #[test]
    fn test_rule_type_from_value() {
        let rule_type = RuleType::from_value(&process_rule_type()).unwrap();
        assert_eq!(rule_type.id, "5");
        assert_eq!(rule_type.disposition_map.get(&20).map(String::as_str), Some("Kill Process"));
        assert_eq!(rule_type.fields.len(), 3);
        assert!(rule_type.released);
    }

    #[test]
    fn test_get_field_by_name_label_and_type() {
        let rule_type = RuleType::from_value(&process_rule_type()).unwrap();
        assert_eq!(
            rule_type.get_field("Command Line", None).map(|f| f.name.as_str()),
            Some("CommandLine")
        );
        assert!(rule_type.get_field("CommandLine", Some(EXCLUDABLE_FIELD)).is_some());
        assert!(rule_type.get_field("CommandLine", Some(SET_FIELD)).is_none());
        assert!(rule_type.get_field("Bogus", None).is_none());
    }

    #[test]
    fn test_concrete_field_defaults() {
        let rule_type = RuleType::from_value(&process_rule_type()).unwrap();

        let image = rule_type.fields[0].to_concrete_field().unwrap();
        assert_eq!(image.values, vec![FieldOption::new("include", ".*")]);

        let grandparent = rule_type.fields[2].to_concrete_field().unwrap();
        assert_eq!(grandparent.values.len(), 2);

        let odd = RuleTypeField {
            label: "Odd".to_string(),
            name: "Odd".to_string(),
            field_type: "slider".to_string(),
            options: vec![],
        };
        assert!(matches!(odd.to_concrete_field(), Err(CaracaraError::InvalidIoa(_))));
    }

    #[test]
    fn test_rule_type_dump_sorts_dispositions() {
        let rule_type = RuleType::from_value(&process_rule_type()).unwrap();
        let dumped = rule_type.dump();
        assert_eq!(
            dumped["disposition_map"],
            json!([
                {"id": 10, "label": "Monitor"},
                {"id": 20, "label": "Kill Process"},
                {"id": 30, "label": "Detect"}
            ])
        );
        assert_eq!(dumped["fields"][2]["type"], "set");
        assert_eq!(dumped["fields"][2]["options"][0]["value"], "svc");
    }
}
