//! Flight Control examples

use tracing::info;

use super::{ExampleContext, pretty_print};
use crate::cli::FlightControlExample;
use crate::error::Result;

pub async fn run(example: FlightControlExample, ctx: &ExampleContext) -> Result<()> {
    match example {
        FlightControlExample::DescribeChildCids => {
            info!("Describing child CIDs");
            let child_cids = ctx.client.flight_control().describe_child_cids().await?;
            pretty_print(&child_cids, false)
        }
    }
}
