//! Download task tracking for idoc
//!
//! Drives in-memory payloads through a best-effort "save to device"
//! operation and exposes each attempt as an observable task:
//! `pending -> downloading -> completed | error`. Terminal tasks stay
//! visible for a grace period, then are removed and their transient
//! resource handle is revoked exactly once.

pub mod error;
pub mod listeners;
pub mod platform;
pub mod task;
pub mod tracker;

pub use error::{DownloadError, Result};
pub use listeners::{Listener, Subscription};
pub use platform::{
    DirectorySaveTarget, HandleRegistry, MemoryHandleRegistry, ResourceHandle, SaveTarget,
};
pub use task::{DownloadId, DownloadStatus, DownloadTask};
pub use tracker::DownloadTracker;
