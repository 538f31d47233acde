//! Platform collaborators: transient payload handles and save targets

use crate::error::{DownloadError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Temporary reference to an in-memory payload; must be revoked when done
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates and releases transient handles for payloads
pub trait HandleRegistry: Send + Sync {
    fn create(&self, payload: &Bytes) -> Result<ResourceHandle>;

    fn revoke(&self, handle: &ResourceHandle);
}

/// Persists a payload on the local device under a filename
#[async_trait]
pub trait SaveTarget: Send + Sync {
    async fn save(&self, handle: &ResourceHandle, payload: Bytes, filename: &str) -> Result<()>;
}

/// Handles backed by an in-process map, with per-handle revoke counts
#[derive(Debug, Default)]
pub struct MemoryHandleRegistry {
    live: Mutex<HashMap<ResourceHandle, Bytes>>,
    revocations: Mutex<HashMap<ResourceHandle, usize>>,
}

impl MemoryHandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload behind a live handle
    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Bytes> {
        self.live.lock().get(handle).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    /// How many times `handle` has been revoked
    pub fn revoke_count(&self, handle: &ResourceHandle) -> usize {
        self.revocations.lock().get(handle).copied().unwrap_or(0)
    }
}

impl HandleRegistry for MemoryHandleRegistry {
    fn create(&self, payload: &Bytes) -> Result<ResourceHandle> {
        let handle = ResourceHandle::new(format!("blob:idoc/{}", Uuid::new_v4()));
        self.live.lock().insert(handle.clone(), payload.clone());
        debug!(handle = %handle, bytes = payload.len(), "resource handle created");
        Ok(handle)
    }

    fn revoke(&self, handle: &ResourceHandle) {
        let was_live = self.live.lock().remove(handle).is_some();
        *self.revocations.lock().entry(handle.clone()).or_insert(0) += 1;
        if was_live {
            debug!(handle = %handle, "resource handle revoked");
        } else {
            warn!(handle = %handle, "revoking a handle that is not live");
        }
    }
}

/// Writes payloads atomically into a directory
#[derive(Debug, Clone)]
pub struct DirectorySaveTarget {
    dir: PathBuf,
}

impl DirectorySaveTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Destination for `filename`, keeping only its final component
    pub fn destination(&self, filename: &str) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DownloadError::InvalidFilename {
                filename: filename.to_string(),
            })?;
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl SaveTarget for DirectorySaveTarget {
    async fn save(&self, handle: &ResourceHandle, payload: Bytes, filename: &str) -> Result<()> {
        let path = self.destination(filename)?;
        debug!(handle = %handle, path = %path.display(), "saving payload");

        tokio::task::spawn_blocking(move || idoc_utils::write_atomic(&path, &payload))
            .await
            .map_err(|e| DownloadError::save(format!("save task aborted: {e}")))??;
        Ok(())
    }
}
