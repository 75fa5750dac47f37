//! Console logging for the example runner
//!
//! The profile's `logging.level` sets the default filter; `RUST_LOG` takes
//! precedence when it is set.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;
use crate::error::{ExampleError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ExampleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(LogFormat::Full),
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ExampleError::InvalidLogFormat(s.to_string())),
        }
    }
}

/// Parse a level name. `warning` and `critical` are accepted as aliases.
pub fn parse_level(level: &str) -> Result<Level> {
    match level.to_ascii_lowercase().as_str() {
        "warning" => Ok(Level::WARN),
        "critical" | "fatal" => Ok(Level::ERROR),
        other => other
            .parse()
            .map_err(|_| ExampleError::InvalidLogLevel(level.to_uppercase())),
    }
}

/// Resolve the profile's logging settings into a level and format
pub fn resolve(settings: Option<&LoggingSettings>) -> Result<(Level, LogFormat)> {
    let level = match settings.and_then(|s| s.level.as_deref()) {
        Some(level) => parse_level(level)?,
        None => Level::INFO,
    };
    let format = match settings.and_then(|s| s.format.as_deref()) {
        Some(format) => format.parse()?,
        None => LogFormat::default(),
    };
    Ok((level, format))
}

/// Install the global subscriber
pub fn init_logging(settings: Option<&LoggingSettings>) -> Result<()> {
    let (level, format) = resolve(settings)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    result.map_err(|e| ExampleError::Config(format!("failed to initialise logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(level: Option<&str>, format: Option<&str>) -> LoggingSettings {
        LoggingSettings {
            level: level.map(str::to_string),
            format: format.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("INFO").unwrap(), Level::INFO);
        assert_eq!(parse_level("Warning").unwrap(), Level::WARN);
        assert_eq!(parse_level("critical").unwrap(), Level::ERROR);
        assert!(matches!(
            parse_level("loud"),
            Err(ExampleError::InvalidLogLevel(level)) if level == "LOUD"
        ));
    }

    #[test]
    fn test_resolve_defaults() {
        assert_eq!(resolve(None).unwrap(), (Level::INFO, LogFormat::Full));
        assert_eq!(
            resolve(Some(&settings(Some("trace"), Some("compact")))).unwrap(),
            (Level::TRACE, LogFormat::Compact)
        );
    }

    #[test]
    fn test_resolve_invalid_format() {
        assert!(matches!(
            resolve(Some(&settings(None, Some("%(name)s: %(message)s")))),
            Err(ExampleError::InvalidLogFormat(_))
        ));
    }
}
