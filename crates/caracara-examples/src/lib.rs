//! Caracara example runner
//!
//! Each example exercises one area of the SDK against a live Falcon tenant.
//! Credentials and example settings come from a YAML profile file; see
//! [`config`] for its layout.

pub mod cli;
pub mod config;
pub mod error;
pub mod filter_loader;
pub mod logging;
pub mod programs;

pub use cli::{Cli, Module};
pub use config::{ExampleSettings, ExamplesConfig, Profile};
pub use error::{ExampleError, Result};
pub use programs::ExampleContext;
