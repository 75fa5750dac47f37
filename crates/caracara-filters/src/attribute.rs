//! Filter attributes
//!
//! An [`AttributeSpec`] describes something that can be filtered on, such as a
//! machine domain, an operating system or a host role. A [`FilterAttribute`] is
//! an instance of a spec carrying a value and an operator, and knows how to
//! render itself as FQL.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{FilterError, Result};
use crate::operator::Operator;
use crate::timestamp;

/// Operators accepted by most attributes
pub const EQUALITY_OPERATORS: &[Operator] = &[Operator::Equal, Operator::Not];

/// Operators accepted by date attributes
pub const COMPARISON_OPERATORS: &[Operator] = &[
    Operator::Equal,
    Operator::Greater,
    Operator::GreaterOrEqual,
    Operator::Less,
    Operator::LessOrEqual,
];

/// Value supplied to a filter attribute
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    Single(String),
    Many(Vec<String>),
}

impl FilterValue {
    /// Split a comma-delimited string into a list; strings without commas stay single
    pub fn from_delimited(value: &str) -> Self {
        if value.contains(',') {
            FilterValue::Many(value.split(',').map(str::to_string).collect())
        } else {
            FilterValue::Single(value.to_string())
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Single(v) => f.write_str(v),
            FilterValue::Many(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Single(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Single(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::Many(values)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        FilterValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for FilterValue {
    fn from(values: &[&str]) -> Self {
        FilterValue::Many(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Rule restricting the values an attribute accepts
#[derive(Clone, Copy, Debug)]
pub enum ValueRule {
    /// Any string
    Free,
    /// One of a fixed list of strings, passed through as-is
    Options(&'static [&'static str]),
    /// Friendly option names mapped to the values Falcon expects
    Mapped(&'static [(&'static str, &'static str)]),
    /// Relative or ISO 8601 timestamp
    Timestamp,
}

/// Static description of a filterable attribute
#[derive(Debug)]
pub struct AttributeSpec {
    /// Name used to create the filter (e.g. `Hostname`)
    pub name: &'static str,
    /// FQL field name (e.g. `hostname`)
    pub fql: &'static str,
    pub description: &'static str,
    pub example: Option<&'static str>,
    pub rule: ValueRule,
    /// Whether a list of values is accepted
    pub accepts_list: bool,
    pub operators: &'static [Operator],
    pub default_operator: Operator,
}

impl AttributeSpec {
    /// Example text shown to users building filters
    pub fn example(&self) -> String {
        if let Some(example) = self.example {
            return example.to_string();
        }

        let options: Vec<&str> = match self.rule {
            ValueRule::Options(options) => options.to_vec(),
            ValueRule::Mapped(pairs) => pairs.iter().map(|(friendly, _)| *friendly).collect(),
            ValueRule::Free | ValueRule::Timestamp => Vec::new(),
        };

        format!(
            "This filter accepts one or more of the following options as a comma \
             delimited list or bare string: {}",
            options.join(", ")
        )
    }

    /// Create an empty attribute instance with the default operator
    pub fn instantiate(&'static self) -> FilterAttribute {
        FilterAttribute::new(self)
    }

    fn accepts_option(&self, value: &str) -> bool {
        match self.rule {
            ValueRule::Options(options) => options.contains(&value),
            ValueRule::Mapped(pairs) => pairs.iter().any(|(friendly, _)| *friendly == value),
            ValueRule::Free | ValueRule::Timestamp => true,
        }
    }

    fn mapped_value<'a>(&self, value: &'a str) -> &'a str {
        if let ValueRule::Mapped(pairs) = self.rule {
            for (friendly, fql) in pairs {
                if *friendly == value {
                    return *fql;
                }
            }
        }
        value
    }
}

/// A filter attribute with a value and operator
#[derive(Clone, Debug)]
pub struct FilterAttribute {
    spec: &'static AttributeSpec,
    value: Option<FilterValue>,
    operator: Operator,
}

impl FilterAttribute {
    pub fn new(spec: &'static AttributeSpec) -> Self {
        Self {
            spec,
            value: None,
            operator: spec.default_operator,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn spec(&self) -> &'static AttributeSpec {
        self.spec
    }

    pub fn value(&self) -> Option<&FilterValue> {
        self.value.as_ref()
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Check whether a value is acceptable for this attribute
    pub fn check_value(&self, value: &FilterValue) -> bool {
        match value {
            FilterValue::Single(v) => self.check_single(v),
            FilterValue::Many(values) => {
                self.spec.accepts_list && values.iter().all(|v| self.check_single(v))
            }
        }
    }

    fn check_single(&self, value: &str) -> bool {
        match self.spec.rule {
            ValueRule::Timestamp => {
                if value.starts_with(['-', '+']) {
                    timestamp::is_relative_timestamp(value)
                } else {
                    timestamp::is_iso_timestamp(value)
                }
            }
            _ => self.spec.accepts_option(value),
        }
    }

    /// Set the value, validating it against the attribute's rule
    pub fn set_value(&mut self, value: impl Into<FilterValue>) -> Result<()> {
        let value = value.into();
        if !self.check_value(&value) {
            return Err(FilterError::InvalidValue {
                filter: self.spec.name.to_string(),
                value: value.to_string(),
            });
        }
        self.value = Some(value);
        Ok(())
    }

    /// Set the operator, which must be one the attribute supports
    pub fn set_operator(&mut self, operator: Operator) -> Result<()> {
        if !self.spec.operators.contains(&operator) {
            return Err(FilterError::InvalidOperator {
                filter: self.spec.name.to_string(),
                operator: operator.to_string(),
                valid: self
                    .spec
                    .operators
                    .iter()
                    .map(Operator::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        self.operator = operator;
        Ok(())
    }

    /// Render as FQL using the current time for relative timestamps
    pub fn fql(&self) -> String {
        self.fql_at(Utc::now())
    }

    /// Render as FQL, resolving relative timestamps against `now`
    pub fn fql_at(&self, now: DateTime<Utc>) -> String {
        let symbol = self.operator.symbol();
        let field = self.spec.fql;

        if let ValueRule::Timestamp = self.spec.rule {
            let Some(FilterValue::Single(value)) = &self.value else {
                return String::new();
            };
            let rendered = if value.starts_with(['-', '+']) {
                timestamp::relative_timestamp(value, now)
                    .map(timestamp::format_fql_timestamp)
                    .unwrap_or_else(|| value.clone())
            } else {
                value.clone()
            };
            return format!("{field}: {symbol}'{rendered}'");
        }

        let fql_value = match &self.value {
            None => return format!("{field}:{symbol}null"),
            Some(FilterValue::Single(v)) => format!("'{}'", self.spec.mapped_value(v)),
            Some(FilterValue::Many(values)) => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("'{}'", self.spec.mapped_value(v)))
                    .collect();
                format!("[{}]", quoted.join(","))
            }
        };

        format!("{field}: {symbol}{fql_value}")
    }
}

impl fmt::Display for FilterAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}: {} {}", self.spec.name, self.operator, value),
            None => write!(f, "{}: {} null", self.spec.name, self.operator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    static FREE: AttributeSpec = AttributeSpec {
        name: "Hostname",
        fql: "hostname",
        description: "Hostname",
        example: None,
        rule: ValueRule::Free,
        accepts_list: true,
        operators: EQUALITY_OPERATORS,
        default_operator: Operator::Equal,
    };

    static MAPPED: AttributeSpec = AttributeSpec {
        name: "Role",
        fql: "product_type_desc",
        description: "Role",
        example: None,
        rule: ValueRule::Mapped(&[("DC", "Domain Controller"), ("Server", "Server")]),
        accepts_list: true,
        operators: EQUALITY_OPERATORS,
        default_operator: Operator::Equal,
    };

    static DATE: AttributeSpec = AttributeSpec {
        name: "LastSeen",
        fql: "last_seen",
        description: "Last seen",
        example: None,
        rule: ValueRule::Timestamp,
        accepts_list: false,
        operators: COMPARISON_OPERATORS,
        default_operator: Operator::GreaterOrEqual,
    };

    #[test]
    fn test_null_value() {
        let attr = FREE.instantiate();
        assert_eq!(attr.fql(), "hostname:null");
    }

    #[test]
    fn test_single_and_list_values() {
        let mut attr = FREE.instantiate();
        attr.set_value("web-01").unwrap();
        assert_eq!(attr.fql(), "hostname: 'web-01'");

        attr.set_value(vec!["web-01", "web-02"]).unwrap();
        attr.set_operator(Operator::Not).unwrap();
        assert_eq!(attr.fql(), "hostname: !['web-01','web-02']");
    }

    #[test]
    fn test_mapped_values() {
        let mut attr = MAPPED.instantiate();
        attr.set_value("DC").unwrap();
        assert_eq!(attr.fql(), "product_type_desc: 'Domain Controller'");

        attr.set_value(vec!["DC", "Server"]).unwrap();
        assert_eq!(
            attr.fql(),
            "product_type_desc: ['Domain Controller','Server']"
        );

        assert!(attr.set_value("Laptop").is_err());
        assert!(attr.set_value(vec!["DC", "Laptop"]).is_err());
    }

    #[test]
    fn test_invalid_operator() {
        let mut attr = FREE.instantiate();
        let err = attr.set_operator(Operator::Greater).unwrap_err();
        assert!(matches!(err, FilterError::InvalidOperator { .. }));
        assert_eq!(attr.operator(), Operator::Equal);
    }

    #[test]
    fn test_timestamp_values() {
        let now = Utc.with_ymd_and_hms(2023, 5, 10, 12, 0, 0).unwrap();
        let mut attr = DATE.instantiate();
        assert_eq!(attr.fql_at(now), "");

        attr.set_value("-1d").unwrap();
        assert_eq!(attr.fql_at(now), "last_seen: >='2023-05-09T12:00:00Z'");

        attr.set_value("2020-01-01T00:00:00Z").unwrap();
        attr.set_operator(Operator::LessOrEqual).unwrap();
        assert_eq!(attr.fql_at(now), "last_seen: <='2020-01-01T00:00:00Z'");

        assert!(attr.set_value("last week").is_err());
        assert!(attr.set_value(vec!["-1d", "-2d"]).is_err());
    }

    #[test]
    fn test_example_text() {
        assert!(MAPPED.example().ends_with("DC, Server"));
    }

    #[test]
    fn test_from_delimited() {
        assert_eq!(
            FilterValue::from_delimited("a,b"),
            FilterValue::Many(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            FilterValue::from_delimited("a"),
            FilterValue::Single("a".to_string())
        );
    }
}
