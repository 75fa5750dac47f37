//! Client model types
//!
//! Falcon wraps every response in the same envelope: a `meta` block, a
//! `resources` payload and an `errors` list. Most payloads are passed back to
//! callers as raw JSON objects, so record types stay close to what the API
//! returns.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use caracara_filters::Fql;

use crate::error::{ApiError, ApiErrors, CaracaraError, Result};

/// A JSON object returned by the API, such as a device or a host group
pub type Record = serde_json::Map<String, Value>;

/// Deserialize `null` as the type's default value
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Pagination offset, either numeric or a scroll token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageOffset {
    Number(u64),
    Token(String),
}

impl PageOffset {
    pub fn as_token(&self) -> Option<&str> {
        match self {
            PageOffset::Token(token) if !token.is_empty() => Some(token.as_str()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: Option<PageOffset>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default, deserialize_with = "null_default")]
    pub total: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, deserialize_with = "null_default")]
    pub query_time: f64,
    #[serde(default)]
    pub powered_by: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Generic Falcon API response wrapper
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct FalconResponse<T = Vec<Value>> {
    #[serde(default, deserialize_with = "null_default")]
    pub meta: Meta,
    #[serde(default, deserialize_with = "null_default")]
    pub resources: T,
    #[serde(default, deserialize_with = "null_default")]
    pub errors: Vec<ApiError>,
}

impl<T: Default> Default for FalconResponse<T> {
    fn default() -> Self {
        Self {
            meta: Meta::default(),
            resources: T::default(),
            errors: Vec::new(),
        }
    }
}

impl<T> FalconResponse<T> {
    /// Total number of results reported by the pagination block
    pub fn total(&self) -> u64 {
        self.meta.pagination.as_ref().map(|p| p.total).unwrap_or(0)
    }

    /// Scroll token for the next page, when the endpoint uses token pagination
    pub fn next_token(&self) -> Option<String> {
        self.meta
            .pagination
            .as_ref()
            .and_then(|p| p.offset.as_ref())
            .and_then(PageOffset::as_token)
            .map(str::to_string)
    }

    /// Fail when the body carries an error list despite a successful status
    pub fn into_result(self) -> Result<Self> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(CaracaraError::Api(ApiErrors::new(self.errors)))
        }
    }
}

/// Body used by endpoints that take a list of IDs
#[derive(Clone, Debug, Serialize)]
pub struct IdsBody<'a> {
    pub ids: &'a [String],
}

/// Named parameter attached to action requests
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    pub value: String,
}

impl ActionParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Query pairs repeating `ids` once per ID, as entity GET endpoints expect
pub fn ids_query(ids: &[String]) -> Vec<(&'static str, &str)> {
    ids.iter().map(|id| ("ids", id.as_str())).collect()
}

/// A list of strings, given directly or as a comma-delimited string
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringList(pub Vec<String>);

impl StringList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for StringList {
    fn from(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl From<String> for StringList {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Vec<String>> for StringList {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<&[String]> for StringList {
    fn from(values: &[String]) -> Self {
        Self(values.to_vec())
    }
}

impl From<Vec<&str>> for StringList {
    fn from(values: Vec<&str>) -> Self {
        Self(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for StringList {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Selects resources either by ID or by filter
#[derive(Clone, Debug)]
pub enum Target {
    Ids(StringList),
    Filter(Fql),
}

impl Target {
    /// Target explicit IDs; a comma-delimited string is split
    pub fn ids(ids: impl Into<StringList>) -> Self {
        Target::Ids(ids.into())
    }

    /// Target everything matching a filter
    pub fn filter(filters: impl Into<Fql>) -> Self {
        Target::Filter(filters.into())
    }

    /// Whether this target selects nothing at all
    pub fn is_empty(&self) -> bool {
        match self {
            Target::Ids(ids) => ids.is_empty(),
            Target::Filter(fql) => fql.is_none(),
        }
    }
}

/// Read a string field from a record
pub fn record_str<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Convert a JSON value into a record, rejecting non-objects
pub fn into_record(value: Value) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CaracaraError::InvalidArgument(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
