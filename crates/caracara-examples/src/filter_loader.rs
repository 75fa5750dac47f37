//! Load `filters` settings into a [`FalconFilter`]
//!
//! Filters are written in the profile file as a list of single-entry maps
//! whose keys use the `Name__OPERATOR` form:
//!
//! ```yaml
//! filters:
//!   - OS: Windows
//!   - LastSeen__GTE: -1d
//! ```

use caracara_filters::FalconFilter;
use serde_yaml::Value;

use crate::error::{ExampleError, Result};

/// Add every filter in `filter_list` to `filters`. A missing list is a no-op.
pub fn parse_filter_list(filter_list: Option<&Value>, filters: &mut FalconFilter) -> Result<()> {
    let Some(filter_list) = filter_list else {
        return Ok(());
    };

    let Value::Sequence(entries) = filter_list else {
        return Err(ExampleError::InvalidFilterList(
            "filters should be provided as a YAML list".to_string(),
        ));
    };

    for entry in entries {
        let Value::Mapping(filter_map) = entry else {
            return Err(ExampleError::InvalidFilterList(format!(
                "filter {entry:?} is not in the correct format"
            )));
        };

        for (key, value) in filter_map {
            let key = scalar(key).ok_or_else(|| {
                ExampleError::InvalidFilterList(format!("filter key {key:?} is not a string"))
            })?;
            let value = scalar(value).ok_or_else(|| {
                ExampleError::InvalidFilterList(format!("value of filter {key} must be a scalar"))
            })?;
            filters.create_new_filter_from_kv_string(&key, &value)?;
        }
    }

    Ok(())
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
