//! Sensor Update Policies API

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CaracaraError, Result};
use crate::http::FalconHttpClient;
use crate::model::FalconResponse;

/// Device ID that reveals the tenant-wide bulk maintenance token
pub const BULK_MAINTENANCE_DEVICE_ID: &str = "MAINTENANCE";

/// Retrieve sensor maintenance (uninstall) tokens
pub struct SensorUpdatePoliciesApiModule {
    http: Arc<FalconHttpClient>,
}

impl SensorUpdatePoliciesApiModule {
    pub const NAME: &'static str = "CrowdStrike Sensor Update Policies API Module";

    pub fn new(http: Arc<FalconHttpClient>) -> Self {
        debug!("Configuring the Sensor Update Policies API");
        Self { http }
    }

    /// Maintenance token for a single device.
    ///
    /// An audit message naming the current UTC time is generated when none
    /// is given.
    pub async fn get_maintenance_token(
        &self,
        device_id: &str,
        audit_message: Option<&str>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Body<'a> {
            audit_message: &'a str,
            device_id: &'a str,
        }

        #[derive(Default, Deserialize)]
        struct UninstallToken {
            #[serde(default)]
            uninstall_token: String,
        }

        let audit_message = audit_message
            .map(str::to_string)
            .unwrap_or_else(default_audit_message);
        info!("Revealing the maintenance token for device {}", device_id);

        let response: FalconResponse<Vec<UninstallToken>> = self
            .http
            .post_json(
                "/policy/combined/reveal-uninstall-token/v1",
                &Body {
                    audit_message: &audit_message,
                    device_id,
                },
            )
            .await?;

        response
            .into_result()?
            .resources
            .into_iter()
            .next()
            .map(|t| t.uninstall_token)
            .ok_or_else(|| {
                CaracaraError::Auth(
                    "the API operation failed to generate a maintenance token; check that the \
                     Sensor Update Policies - Write permission is enabled on the API client"
                        .to_string(),
                )
            })
    }

    /// Tenant-wide bulk maintenance token
    pub async fn get_bulk_maintenance_token(&self, audit_message: Option<&str>) -> Result<String> {
        self.get_maintenance_token(BULK_MAINTENANCE_DEVICE_ID, audit_message)
            .await
    }
}

fn default_audit_message() -> String {
    format!(
        "Generated via Caracara at {} UTC",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_audit_message() {
        let message = default_audit_message();
        assert!(message.starts_with("Generated via Caracara at "));
        assert!(message.ends_with(" UTC"));
        assert_eq!(message.len(), "Generated via Caracara at 2024-01-01 00:00:00 UTC".len());
    }
}
