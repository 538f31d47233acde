//! Core errors, constants, and configuration for the `idoc` client runtime.
//!
//! Every other crate in the workspace builds on the pieces defined here.
//!
//! ## Key Components
//!
//! - **`errors`**: The primary `Error` enum and `Result` alias used by
//!   configuration loading and the host binary.
//! - **`constants`**: Grace periods, delays, cache key prefixes and the
//!   environment variable names read by the configuration layer.
//! - **`config`**: `IdocConfig`, assembled from defaults, an optional JSON
//!   file and environment variables.

pub mod config;
pub mod constants;
pub mod errors;

pub use self::{
    config::{ConfigSource, IdocConfig, IdocConfigBuilder},
    constants::*,
    errors::{Error, Result},
};
