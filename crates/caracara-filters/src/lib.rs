//! Caracara Filters - FQL builder for the Falcon API
//!
//! This crate provides:
//! - Filter attributes for hosts, RTR sessions, users and common fields
//! - Validation of option lists, operators and date values
//! - `FalconFilter` to combine attributes into a single FQL string
//! - `Fql`, the filter argument accepted by Caracara API operations

pub mod attribute;
pub mod catalogue;
pub mod error;
pub mod falcon_filter;
pub mod operator;
pub mod timestamp;

pub use attribute::{AttributeSpec, FilterAttribute, FilterValue, ValueRule};
pub use catalogue::{Dialect, PLATFORMS, RTR_BASE_COMMANDS};
pub use error::FilterError;
pub use falcon_filter::{FalconFilter, Fql};
pub use operator::Operator;
