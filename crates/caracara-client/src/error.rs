//! Client error types for the Caracara SDK

use std::fmt;

use caracara_filters::FilterError;
use serde::{Deserialize, Serialize};

/// Error entry returned by the Falcon API
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

/// All errors reported by a failed Falcon API call
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiErrors {
    pub errors: Vec<ApiError>,
}

impl ApiErrors {
    pub fn new(errors: Vec<ApiError>) -> Self {
        Self { errors }
    }

    /// Code of the first error, or 500 when the API gave none
    pub fn code(&self) -> u16 {
        self.errors.first().map(|e| e.code).unwrap_or(500)
    }
}

impl fmt::Display for ApiErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("[{}] {}", e.code, e.message))
            .collect();
        f.write_str(&rendered.join(", "))
    }
}

/// Error type for Caracara operations
#[derive(Debug, thiserror::Error)]
pub enum CaracaraError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("auth failed: {0}")]
    Auth(String),

    #[error("Falcon API error: {0}")]
    Api(ApiErrors),

    #[error("you must provide either a filter or a list of IDs")]
    MustProvideFilterOrId,

    #[error("you must provide a filter to target this action")]
    MustProvideFilter,

    #[error("the requested host group could not be found")]
    HostGroupNotFound,

    #[error("the requested device could not be found")]
    DeviceNotFound,

    #[error("no user found for {0}")]
    UserNotFound(String),

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("at least one of these arguments must be provided: {}", .0.join(", "))]
    MissingArguments(Vec<String>),

    #[error("invalid online state: {0}")]
    InvalidOnlineState(String),

    #[error("invalid platform: {0}")]
    InvalidPlatform(String),

    #[error("invalid RTR command: {0}")]
    InvalidRtrCommand(String),

    #[error("invalid RTR permission level: {0}")]
    InvalidPermissionLevel(String),

    #[error("batch session is not connected")]
    NotConnected,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid custom IOA: {0}")]
    InvalidIoa(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("unknown cloud: {0}")]
    UnknownCloud(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CaracaraError {
    /// HTTP-style status code describing the error
    pub fn code(&self) -> u16 {
        match self {
            CaracaraError::Api(errors) => errors.code(),
            CaracaraError::HostGroupNotFound
            | CaracaraError::DeviceNotFound
            | CaracaraError::UserNotFound(_) => 404,
            CaracaraError::Auth(_) => 401,
            CaracaraError::MustProvideFilterOrId
            | CaracaraError::MustProvideFilter
            | CaracaraError::MissingArgument(_)
            | CaracaraError::MissingArguments(_)
            | CaracaraError::InvalidOnlineState(_)
            | CaracaraError::InvalidPlatform(_)
            | CaracaraError::InvalidRtrCommand(_)
            | CaracaraError::InvalidPermissionLevel(_)
            | CaracaraError::InvalidArgument(_)
            | CaracaraError::InvalidIoa(_)
            | CaracaraError::UnknownCloud(_)
            | CaracaraError::Filter(_) => 400,
            _ => 500,
        }
    }
}

impl From<ApiErrors> for CaracaraError {
    fn from(errors: ApiErrors) -> Self {
        CaracaraError::Api(errors)
    }
}

pub type Result<T> = std::result::Result<T, CaracaraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_display() {
        let errors = ApiErrors::new(vec![
            ApiError {
                code: 400,
                message: "invalid filter".to_string(),
            },
            ApiError {
                code: 404,
                message: "not found".to_string(),
            },
        ]);
        assert_eq!(errors.to_string(), "[400] invalid filter, [404] not found");
        assert_eq!(errors.code(), 400);
        assert_eq!(ApiErrors::default().code(), 500);
    }

    #[test]
    fn test_error_display() {
        let err = CaracaraError::NotConnected;
        assert_eq!(err.to_string(), "batch session is not connected");

        let err = CaracaraError::MissingArguments(vec!["name".to_string(), "description".to_string()]);
        assert_eq!(
            err.to_string(),
            "at least one of these arguments must be provided: name, description"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CaracaraError::DeviceNotFound.code(), 404);
        assert_eq!(CaracaraError::HostGroupNotFound.code(), 404);
        assert_eq!(CaracaraError::MustProvideFilter.code(), 400);
        assert_eq!(CaracaraError::UserNotFound("a@b.c".to_string()).code(), 404);
        assert_eq!(CaracaraError::InvalidIoa("no action".to_string()).code(), 400);
        assert_eq!(CaracaraError::NotConnected.code(), 500);
    }

    #[test]
    fn test_from_filter_error() {
        let err: CaracaraError = FilterError::UnknownFilter("Bogus".to_string()).into();
        assert!(matches!(err, CaracaraError::Filter(_)));
        assert_eq!(err.code(), 400);
    }
}
