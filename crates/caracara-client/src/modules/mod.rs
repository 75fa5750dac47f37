//! Falcon API modules

pub mod custom_ioa;
pub mod flight_control;
pub mod hosts;
pub mod policies;
pub mod rtr;
pub mod sensor_download;
pub mod sensor_update_policies;
pub mod users;

pub use flight_control::FlightControlApiModule;
pub use hosts::HostsApiModule;
pub use policies::{PreventionPoliciesApiModule, ResponsePoliciesApiModule, SortOrder};
pub use rtr::RtrApiModule;
pub use sensor_download::SensorDownloadApiModule;
pub use sensor_update_policies::SensorUpdatePoliciesApiModule;
pub use users::UsersApiModule;
