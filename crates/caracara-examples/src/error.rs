//! Errors raised by the example programs

use caracara_client::CaracaraError;
use caracara_filters::FilterError;

/// Error type for example runs and configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ExampleError {
    #[error("{0} -> No devices matched the provided Falcon Filter.")]
    NoDevicesFound(String),

    #[error("{0} -> No groups matched the provided Falcon Filter.")]
    NoGroupsFound(String),

    #[error("{0} -> No logins matched the provided Falcon Filter.")]
    NoLoginsFound(String),

    #[error("{0} -> No network address changes matched the provided Falcon Filter.")]
    NoAddressesFound(String),

    #[error("No successful connections were made for this batch.")]
    NoSessionsConnected,

    #[error("No '{0}' provided -> A required argument was not provided.")]
    MissingArgument(String),

    #[error("setting '{name}' is invalid: {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("invalid filter list: {0}")]
    InvalidFilterList(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("the profile named {0} does not exist in the configuration file")]
    ProfileNotFound(String),

    #[error(
        "no profile chosen; pass --profile or mark one profile as default (available: {})",
        .0.join(", ")
    )]
    NoProfileSelected(Vec<String>),

    #[error("{0} is not a valid logging level")]
    InvalidLogLevel(String),

    #[error("{0} is not a valid logging format (expected full, compact or pretty)")]
    InvalidLogFormat(String),

    #[error(transparent)]
    Caracara(#[from] CaracaraError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExampleError {
    pub fn no_devices(filter_fql: &str) -> Self {
        Self::NoDevicesFound(describe_filter(filter_fql, "No filters applied"))
    }

    pub fn no_groups(filter_fql: &str) -> Self {
        Self::NoGroupsFound(describe_filter(filter_fql, "No filters applied"))
    }
}

fn describe_filter(filter_fql: &str, fallback: &str) -> String {
    if filter_fql.is_empty() {
        fallback.to_string()
    } else {
        filter_fql.to_string()
    }
}

pub type Result<T> = std::result::Result<T, ExampleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ExampleError::no_devices("").to_string(),
            "No filters applied -> No devices matched the provided Falcon Filter."
        );
        assert_eq!(
            ExampleError::no_devices("platform_name: 'Windows'").to_string(),
            "platform_name: 'Windows' -> No devices matched the provided Falcon Filter."
        );
        assert_eq!(
            ExampleError::MissingArgument("command".to_string()).to_string(),
            "No 'command' provided -> A required argument was not provided."
        );
        assert!(
            ExampleError::NoProfileSelected(vec!["a".to_string(), "b".to_string()])
                .to_string()
                .ends_with("(available: a, b)")
        );
    }
}
