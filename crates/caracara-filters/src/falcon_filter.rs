//! FQL filter wrapper
//!
//! [`FalconFilter`] keeps track of filter attributes and renders a complete
//! FQL string ready to pass to Falcon API calls. Each filter is referred to by
//! a random ID, since several filters of the same attribute may be combined
//! (for example a date range built from two `LastSeen` filters).

use std::fmt;

use tracing::{debug, info};
use uuid::Uuid;

use crate::attribute::{AttributeSpec, FilterAttribute, FilterValue};
use crate::catalogue::Dialect;
use crate::error::{FilterError, Result};
use crate::operator::Operator;

/// Builder for FQL filter strings
#[derive(Clone, Debug, Default)]
pub struct FalconFilter {
    dialect: Dialect,
    filters: Vec<(String, FilterAttribute)>,
}

impl FalconFilter {
    pub fn new(dialect: Dialect) -> Self {
        debug!("Initialising a new {:?} FalconFilter", dialect);
        Self {
            dialect,
            filters: Vec::new(),
        }
    }

    /// Create a filter pre-populated with attributes
    pub fn with_filters(dialect: Dialect, filters: impl IntoIterator<Item = FilterAttribute>) -> Self {
        let mut filter = Self::new(dialect);
        for attribute in filters {
            filter.add_filter(attribute);
        }
        filter
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Attributes that can be created by name in this filter's dialect
    pub fn available_filters(&self) -> &'static [&'static AttributeSpec] {
        self.dialect.attributes()
    }

    pub fn filters(&self) -> impl Iterator<Item = (&str, &FilterAttribute)> {
        self.filters.iter().map(|(id, attr)| (id.as_str(), attr))
    }

    pub fn get(&self, filter_id: &str) -> Option<&FilterAttribute> {
        self.filters
            .iter()
            .find(|(id, _)| id.as_str() == filter_id)
            .map(|(_, attr)| attr)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Add an attribute and return its new filter ID
    pub fn add_filter(&mut self, attribute: FilterAttribute) -> String {
        let filter_id = Uuid::new_v4().to_string();
        info!(
            "Adding a new {} filter with filter ID {}",
            attribute.name(),
            filter_id
        );
        self.filters.push((filter_id.clone(), attribute));
        filter_id
    }

    /// Remove a filter; unknown IDs are ignored
    pub fn remove_filter(&mut self, filter_id: &str) {
        let before = self.filters.len();
        self.filters.retain(|(id, _)| id.as_str() != filter_id);
        if self.filters.len() < before {
            info!("Removing filter with ID {}", filter_id);
        } else {
            info!(
                "Attempted to remove filter with ID {}, but it does not exist",
                filter_id
            );
        }
    }

    /// Create a filter by attribute name.
    ///
    /// When `operator` is `None` the attribute's default operator is kept.
    pub fn create_new_filter(
        &mut self,
        name: &str,
        value: Option<FilterValue>,
        operator: Option<Operator>,
    ) -> Result<String> {
        debug!(
            "Creating a new {} filter (initial operator: {:?}; initial value: {:?})",
            name, operator, value
        );

        let spec = self
            .dialect
            .find(name)
            .ok_or_else(|| FilterError::UnknownFilter(name.to_string()))?;

        let mut attribute = spec.instantiate();
        if let Some(value) = value {
            attribute.set_value(value)?;
        }
        if let Some(operator) = operator {
            attribute.set_operator(operator)?;
        }

        let filter_id = self.add_filter(attribute);
        info!("Created new {} filter with ID {}", name, filter_id);
        Ok(filter_id)
    }

    /// Create a filter from a key such as `LastSeen__GTE` and a value.
    ///
    /// Comma-delimited string values are split into lists.
    pub fn create_new_filter_from_kv_string(&mut self, key: &str, value: &str) -> Result<String> {
        info!("Loading filter from KV string: {}", key);

        let (name, operator) = match key.split_once("__") {
            Some((name, operator)) => {
                if name.is_empty() || operator.is_empty() || operator.contains("__") {
                    return Err(FilterError::InvalidKey(key.to_string()));
                }
                (name, Some(operator.parse::<Operator>()?))
            }
            None => (key, None),
        };

        self.create_new_filter(name, Some(FilterValue::from_delimited(value)), operator)
    }

    pub fn set_filter_value(&mut self, filter_id: &str, value: impl Into<FilterValue>) -> Result<()> {
        let value = value.into();
        info!("Setting filter {} to {}", filter_id, value);
        self.get_mut(filter_id)?.set_value(value)
    }

    pub fn set_filter_operator(&mut self, filter_id: &str, operator: Operator) -> Result<()> {
        info!(
            "Setting the filter operator of filter {} to {}",
            filter_id, operator
        );
        self.get_mut(filter_id)?.set_operator(operator)
    }

    fn get_mut(&mut self, filter_id: &str) -> Result<&mut FilterAttribute> {
        self.filters
            .iter_mut()
            .find(|(id, _)| id.as_str() == filter_id)
            .map(|(_, attr)| attr)
            .ok_or_else(|| FilterError::FilterNotFound(filter_id.to_string()))
    }

    /// Render every attribute as FQL joined by `+`
    pub fn get_fql(&self) -> String {
        let fql = self
            .filters
            .iter()
            .map(|(_, attr)| attr.fql())
            .collect::<Vec<_>>()
            .join("+");
        debug!("Generated FQL: {}", fql);
        fql
    }
}

impl fmt::Display for FalconFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_fql())
    }
}

/// An optional FQL string passed to API operations.
///
/// Built from a [`FalconFilter`], a raw FQL string, or nothing at all. Empty
/// strings mean "no filter".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fql(Option<String>);

impl Fql {
    /// No filter
    pub fn none() -> Self {
        Self(None)
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    fn from_string(fql: String) -> Self {
        if fql.is_empty() { Self(None) } else { Self(Some(fql)) }
    }
}

impl fmt::Display for Fql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or(""))
    }
}

impl From<&FalconFilter> for Fql {
    fn from(filter: &FalconFilter) -> Self {
        Self::from_string(filter.get_fql())
    }
}

impl From<FalconFilter> for Fql {
    fn from(filter: FalconFilter) -> Self {
        Self::from(&filter)
    }
}

impl From<&str> for Fql {
    fn from(fql: &str) -> Self {
        Self::from_string(fql.to_string())
    }
}

impl From<String> for Fql {
    fn from(fql: String) -> Self {
        Self::from_string(fql)
    }
}

impl From<&Fql> for Fql {
    fn from(fql: &Fql) -> Self {
        fql.clone()
    }
}

impl From<&String> for Fql {
    fn from(fql: &String) -> Self {
        Self::from_string(fql.clone())
    }
}

impl<T: Into<Fql>> From<Option<T>> for Fql {
    fn from(fql: Option<T>) -> Self {
        fql.map(Into::into).unwrap_or_default()
    }
}

impl From<()> for Fql {
    fn from(_: ()) -> Self {
        Self(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::HOST_HOSTNAME;

    #[test]
    fn test_empty_filter() {
        let filter = FalconFilter::default();
        assert_eq!(filter.dialect(), Dialect::Hosts);
        assert!(filter.is_empty());
        assert_eq!(filter.get_fql(), "");
        assert!(Fql::from(&filter).is_none());
    }

    #[test]
    fn test_create_and_join() {
        let mut filter = FalconFilter::new(Dialect::Hosts);
        filter
            .create_new_filter("OS", Some("Windows".into()), None)
            .unwrap();
        filter
            .create_new_filter("Hostname", Some(vec!["a", "b"].into()), Some(Operator::Not))
            .unwrap();

        assert_eq!(
            filter.get_fql(),
            "platform_name: 'Windows'+hostname: !['a','b']"
        );
        assert_eq!(filter.to_string(), filter.get_fql());
    }

    #[test]
    fn test_unknown_filter_name() {
        let mut filter = FalconFilter::new(Dialect::Users);
        let err = filter.create_new_filter("Hostname", None, None).unwrap_err();
        assert_eq!(err, FilterError::UnknownFilter("Hostname".to_string()));
    }

    #[test]
    fn test_default_operator_kept() {
        let mut filter = FalconFilter::new(Dialect::Hosts);
        let id = filter
            .create_new_filter("LastSeen", Some("-1d".into()), None)
            .unwrap();
        assert_eq!(filter.get(&id).unwrap().operator(), Operator::GreaterOrEqual);
    }

    #[test]
    fn test_kv_string() {
        let mut filter = FalconFilter::new(Dialect::Hosts);
        let id = filter
            .create_new_filter_from_kv_string("Role__NOT", "DC,Server")
            .unwrap();
        assert_eq!(
            filter.get(&id).unwrap().fql(),
            "product_type_desc: !['Domain Controller','Server']"
        );

        assert!(filter.create_new_filter_from_kv_string("Role__", "DC").is_err());
        assert!(
            filter
                .create_new_filter_from_kv_string("Role__NOT__EQUAL", "DC")
                .is_err()
        );
    }

    #[test]
    fn test_set_and_remove() {
        let mut filter = FalconFilter::new(Dialect::Hosts);
        let id = filter.add_filter(HOST_HOSTNAME.instantiate());
        filter.set_filter_value(&id, "web-01").unwrap();
        filter.set_filter_operator(&id, Operator::Not).unwrap();
        assert_eq!(filter.get_fql(), "hostname: !'web-01'");

        assert!(matches!(
            filter.set_filter_value("missing", "x"),
            Err(FilterError::FilterNotFound(_))
        ));

        filter.remove_filter("missing");
        assert_eq!(filter.len(), 1);
        filter.remove_filter(&id);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_fql_conversions() {
        assert_eq!(Fql::from("").as_deref(), None);
        assert_eq!(Fql::from("hostname: 'a'").as_deref(), Some("hostname: 'a'"));
        assert_eq!(Fql::from(None::<&str>), Fql::none());
        assert_eq!(Fql::from(Some("x".to_string())).as_deref(), Some("x"));
        assert!(Fql::from(()).is_none());
    }
}
