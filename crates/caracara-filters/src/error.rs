//! Filter error types

/// Errors raised while building FQL filters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("unknown filter operator: {0}")]
    UnknownOperator(String),

    #[error("invalid value for filter {filter}: {value}")]
    InvalidValue { filter: String, value: String },

    #[error("operator {operator} is not valid for filter {filter} (valid: {valid})")]
    InvalidOperator {
        filter: String,
        operator: String,
        valid: String,
    },

    #[error("filter with ID {0} does not exist here")]
    FilterNotFound(String),

    #[error("invalid filter key: {0}")]
    InvalidKey(String),

    #[error("unknown filter dialect: {0}")]
    UnknownDialect(String),
}

pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FilterError::UnknownFilter("Colour".to_string());
        assert_eq!(err.to_string(), "unknown filter: Colour");

        let err = FilterError::InvalidOperator {
            filter: "Hostname".to_string(),
            operator: "GTE".to_string(),
            valid: "EQUAL, NOT".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operator GTE is not valid for filter Hostname (valid: EQUAL, NOT)"
        );

        let err = FilterError::FilterNotFound("abc".to_string());
        assert_eq!(err.to_string(), "filter with ID abc does not exist here");
    }
}
