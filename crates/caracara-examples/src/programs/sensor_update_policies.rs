//! Sensor update policy examples

use tracing::info;

use super::ExampleContext;
use crate::cli::SensorUpdatePoliciesExample;
use crate::error::Result;

pub async fn run(example: SensorUpdatePoliciesExample, ctx: &ExampleContext) -> Result<()> {
    match example {
        SensorUpdatePoliciesExample::GetMaintenanceToken => get_maintenance_token(ctx).await,
    }
}

/// Reveal the token of the configured `device_id`, or the bulk maintenance
/// token when none is set
async fn get_maintenance_token(ctx: &ExampleContext) -> Result<()> {
    let module = ctx.client.sensor_update_policies();
    let token = match ctx.settings.get_str("device_id").filter(|id| !id.is_empty()) {
        Some(device_id) => {
            info!("Getting the maintenance token for device {}", device_id);
            module.get_maintenance_token(&device_id, None).await?
        }
        None => {
            info!("Getting the bulk maintenance token");
            module.get_bulk_maintenance_token(None).await?
        }
    };
    println!("{token}");
    Ok(())
}
