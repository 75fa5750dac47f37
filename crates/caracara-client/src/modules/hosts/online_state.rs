//! Online state filtering

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::HostsApiModule;
use crate::error::{CaracaraError, Result};
use crate::model::record_str;

/// Connection state reported by the online state endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OnlineState {
    Online,
    Offline,
    Unknown,
}

impl OnlineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnlineState::Online => "online",
            OnlineState::Offline => "offline",
            OnlineState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OnlineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnlineState {
    type Err = CaracaraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "online" => Ok(OnlineState::Online),
            "offline" => Ok(OnlineState::Offline),
            "unknown" => Ok(OnlineState::Unknown),
            other => Err(CaracaraError::InvalidOnlineState(other.to_string())),
        }
    }
}

impl HostsApiModule {
    /// Check that a string names a valid online state
    pub fn validate_online_state(&self, online_state: &str) -> Result<OnlineState> {
        let state = online_state.parse()?;
        debug!("Validated online state {}", state);
        Ok(state)
    }

    /// Keep only the device IDs currently in the given online state
    pub async fn filter_device_ids_by_online_state(
        &self,
        device_ids: &[String],
        online_state: OnlineState,
    ) -> Result<Vec<String>> {
        let states = self.get_online_state(device_ids).await?;
        Ok(states
            .into_iter()
            .filter(|(_, record)| record_str(record, "state") == Some(online_state.as_str()))
            .map(|(device_id, _)| device_id)
            .collect())
    }
}
