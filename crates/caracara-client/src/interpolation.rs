//! Environment variable interpolation
//!
//! Strings such as `${FALCON_CLIENT_ID}` are replaced with the value of the
//! named environment variable, so credentials can be kept out of code and
//! configuration files. `$$` produces a literal `$`.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

static INTERPOLATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\$|\{(\w+)\})").expect("Invalid regex pattern"));

/// Replaces `${NAME}` references with environment variable values
#[derive(Clone, Copy, Debug, Default)]
pub struct VariableInterpolator;

impl VariableInterpolator {
    pub fn new() -> Self {
        debug!("Instantiating a Variable Interpolator");
        Self
    }

    /// Interpolate from the process environment.
    ///
    /// An unset variable is replaced by its own name.
    pub fn interpolate(&self, input: &str) -> String {
        self.interpolate_with(input, |name| std::env::var(name).ok())
    }

    /// Interpolate using a custom variable lookup
    pub fn interpolate_with<F>(&self, input: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        INTERPOLATION_PATTERN
            .replace_all(input, |caps: &Captures<'_>| match caps.get(2) {
                Some(name) => {
                    debug!("Interpolating the environment variable: {}", name.as_str());
                    lookup(name.as_str()).unwrap_or_else(|| name.as_str().to_string())
                }
                None => "$".to_string(),
            })
            .into_owned()
    }
}
