//! Prevention and response policy examples

use caracara_client::{Policy, SortOrder};
use caracara_filters::{Dialect, FalconFilter, FilterValue};
use tracing::{debug, info};

use super::{ExampleContext, prettify_json, pretty_print};
use crate::cli::{PreventionPoliciesExample, ResponsePoliciesExample};
use crate::error::Result;

const DEFAULT_PLATFORM: &str = "Windows";

pub async fn run_prevention(example: PreventionPoliciesExample, ctx: &ExampleContext) -> Result<()> {
    let module = ctx.client.prevention_policies();
    match example {
        PreventionPoliciesExample::CreatePreventionPolicy => {
            let policy = module.new_policy(&platform(ctx))?;
            pretty_print(&policy.flat_dump(), false)
        }
        PreventionPoliciesExample::DescribePreventionPolicies => {
            info!("Grabbing all Windows prevention policies from the Falcon tenant");
            let policies = module
                .describe_policies(&windows_filter(ctx)?, SortOrder::default())
                .await?;
            print_policies("Prevention", &policies)
        }
    }
}

pub async fn run_response(example: ResponsePoliciesExample, ctx: &ExampleContext) -> Result<()> {
    let module = ctx.client.response_policies();
    match example {
        ResponsePoliciesExample::CreateResponsePolicy => {
            let policy = module.new_policy(&platform(ctx))?;
            pretty_print(&policy.flat_dump(), false)
        }
        ResponsePoliciesExample::DescribeResponsePolicies => {
            info!("Grabbing all Windows response policies from the Falcon tenant");
            let policies = module
                .describe_policies(&windows_filter(ctx)?, SortOrder::default())
                .await?;
            print_policies("Response", &policies)
        }
    }
}

/// Platform for generated policies, `Windows` unless configured
fn platform(ctx: &ExampleContext) -> String {
    ctx.settings
        .get_str("platform")
        .unwrap_or_else(|| DEFAULT_PLATFORM.to_string())
}

fn windows_filter(ctx: &ExampleContext) -> Result<FalconFilter> {
    let mut filters = ctx.client.falcon_filter(Dialect::Hosts);
    filters.create_new_filter("OS", Some(FilterValue::from(DEFAULT_PLATFORM)), None)?;
    Ok(filters)
}

fn print_policies(kind: &str, policies: &[Policy]) -> Result<()> {
    for (i, policy) in policies.iter().enumerate() {
        println!(
            "{} policy {}: {} ({})",
            kind,
            i + 1,
            policy.name.as_deref().unwrap_or("Unnamed"),
            policy.platform_name.as_deref().unwrap_or("Unknown platform")
        );
        if let Some(description) = policy.description.as_deref().filter(|d| !d.is_empty()) {
            println!("{description}");
        }

        info!("Policy JSON\n{}", prettify_json(&policy.dump())?);
        debug!(
            "Flat policy JSON for use with the Falcon API\n{}",
            prettify_json(&policy.flat_dump())?
        );
    }
    Ok(())
}
