//! Shared utilities for idoc
//!
//! This crate provides the runtime plumbing used across the workspace:
//! logging setup, delayed one-shot callbacks, and atomic file writes.

pub mod atomic_file;
pub mod deferred;
pub mod logging;

pub use atomic_file::*;
pub use deferred::*;
pub use logging::*;
