//! Download task snapshots handed to readers and listeners

use crate::platform::ResourceHandle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

pub type DownloadId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Completed,
    Error,
}

impl DownloadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Error)
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// One tracked save attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadTask {
    pub id: DownloadId,
    pub filename: String,
    /// 0 to 100
    pub progress: u8,
    pub status: DownloadStatus,
    pub error: Option<String>,
    /// Set once the transient handle for the payload exists
    pub handle: Option<ResourceHandle>,
    pub created_at: DateTime<Utc>,
}

impl DownloadTask {
    pub(crate) fn pending(id: DownloadId, filename: String) -> Self {
        Self {
            id,
            filename,
            progress: 0,
            status: DownloadStatus::Pending,
            error: None,
            handle: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_status_lowercase() {
        let mut task = DownloadTask::pending(Uuid::new_v4(), "contract.pdf".into());
        task.status = DownloadStatus::Downloading;

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "downloading");
        assert_eq!(json["progress"], 0);
        assert!(json["error"].is_null());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!DownloadStatus::Pending.is_terminal());
        assert!(!DownloadStatus::Downloading.is_terminal());
        assert!(DownloadStatus::Completed.is_terminal());
        assert!(DownloadStatus::Error.is_terminal());
    }
}
