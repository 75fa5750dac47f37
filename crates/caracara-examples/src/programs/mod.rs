//! The example programs, grouped by API module

mod flight_control;
mod hosts;
mod policies;
mod rtr;
mod sensor_update_policies;
mod users;

use std::time::Instant;

use caracara_client::Client;
use caracara_filters::{Dialect, FalconFilter};
use serde::Serialize;

use crate::cli::Module;
use crate::config::ExampleSettings;
use crate::error::Result;
use crate::filter_loader::parse_filter_list;

/// Everything an example needs to run
pub struct ExampleContext {
    pub client: Client,
    pub settings: ExampleSettings,
    started: Instant,
}

impl ExampleContext {
    pub fn new(client: Client, settings: ExampleSettings) -> Self {
        Self {
            client,
            settings,
            started: Instant::now(),
        }
    }

    /// Seconds since the example started
    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Filter built from the example's `filters` setting
    pub fn configured_filter(&self, dialect: Dialect) -> Result<FalconFilter> {
        let mut filters = self.client.falcon_filter(dialect);
        parse_filter_list(self.settings.get("filters"), &mut filters)?;
        Ok(filters)
    }
}

/// Run the chosen example
pub async fn run(module: Module, ctx: &ExampleContext) -> Result<()> {
    match module {
        Module::Hosts { example } => hosts::run(example, ctx).await,
        Module::Rtr { example } => rtr::run(example, ctx).await,
        Module::Users { example } => users::run(example, ctx).await,
        Module::PreventionPolicies { example } => policies::run_prevention(example, ctx).await,
        Module::ResponsePolicies { example } => policies::run_response(example, ctx).await,
        Module::FlightControl { example } => flight_control::run(example, ctx).await,
        Module::SensorUpdatePolicies { example } => sensor_update_policies::run(example, ctx).await,
    }
}

/// Render data as indented JSON with sorted keys
pub fn prettify_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Print data as indented JSON, optionally expanding escaped new lines
pub fn pretty_print<T: Serialize + ?Sized>(data: &T, rewrite_new_lines: bool) -> Result<()> {
    let rendered = prettify_json(data)?;
    if rewrite_new_lines {
        println!("{}", rendered.replace("\\n", "\n"));
    } else {
        println!("{rendered}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prettify_json_sorts_keys() {
        let rendered = prettify_json(&json!({"b": 1, "a": {"d": 2, "c": 3}})).unwrap();
        assert_eq!(
            rendered,
            "{\n  \"a\": {\n    \"c\": 3,\n    \"d\": 2\n  },\n  \"b\": 1\n}"
        );
    }
}
