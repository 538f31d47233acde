//! Download task tracker
//!
//! Owns the id -> task map for the lifetime of the process. Every state
//! change is broadcast to listeners with a snapshot of the whole list.
//! Terminal tasks are removed after a grace period; the handle of a
//! removed task is revoked by whichever path removed it, and only that
//! path, so a `clear_completed` racing a cleanup timer never revokes twice.

use crate::error::{DownloadError, Result};
use crate::listeners::{Listener, ListenerRegistry, Subscription};
use crate::platform::{HandleRegistry, SaveTarget};
use crate::task::{DownloadId, DownloadStatus, DownloadTask};
use bytes::Bytes;
use futures::future::join_all;
use futures::FutureExt;
use idoc_core::config::DownloadConfig;
use idoc_utils::DeferredTask;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tracks save attempts; cheap to clone and share
#[derive(Clone)]
pub struct DownloadTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    tasks: Mutex<IndexMap<DownloadId, DownloadTask>>,
    cleanups: Mutex<HashMap<DownloadId, DeferredTask>>,
    listeners: Arc<ListenerRegistry>,
    handles: Arc<dyn HandleRegistry>,
    target: Arc<dyn SaveTarget>,
    config: DownloadConfig,
}

impl DownloadTracker {
    pub fn new(
        handles: Arc<dyn HandleRegistry>,
        target: Arc<dyn SaveTarget>,
        config: DownloadConfig,
    ) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                tasks: Mutex::new(IndexMap::new()),
                cleanups: Mutex::new(HashMap::new()),
                listeners: Arc::new(ListenerRegistry::default()),
                handles,
                target,
                config,
            }),
        }
    }

    /// Save `payload` as `filename`, tracking the attempt as a task.
    ///
    /// Resolves once the save has succeeded or failed; never returns an
    /// error. Failures are recorded on the task. Removal happens later.
    ///
    /// The save itself runs on a spawned task, so dropping the returned
    /// future does not strand the task in `downloading`: it still reaches
    /// a terminal state and is cleaned up.
    pub async fn download(&self, payload: Bytes, filename: impl Into<String>) -> DownloadId {
        let filename = filename.into();
        let id = Uuid::new_v4();

        self.inner
            .tasks
            .lock()
            .insert(id, DownloadTask::pending(id, filename.clone()));
        debug!(download_id = %id, filename = %filename, "download pending");
        self.inner.notify();

        self.inner.update(id, |task| task.status = DownloadStatus::Downloading);
        self.inner.notify();

        let tracker = self.clone();
        let attempt = tokio::spawn(async move { tracker.finish(id, payload, filename).await });
        if let Err(e) = attempt.await {
            warn!(download_id = %id, error = %e, "download attempt aborted");
        }

        id
    }

    /// Run the save and record its outcome
    async fn finish(&self, id: DownloadId, payload: Bytes, filename: String) {
        let outcome = AssertUnwindSafe(self.inner.save(id, payload, &filename))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(DownloadError::save("save panicked")));

        match outcome {
            Ok(()) => {
                self.inner.update(id, |task| {
                    task.progress = 100;
                    task.status = DownloadStatus::Completed;
                });
                info!(download_id = %id, filename = %filename, "download completed");
                self.inner.notify();
                self.schedule_removal(id, self.inner.config.success_grace());
            }
            Err(e) => {
                let message = e.to_string();
                self.inner.update(id, |task| {
                    task.status = DownloadStatus::Error;
                    task.error = Some(message.clone());
                });
                warn!(download_id = %id, filename = %filename, error = %message, "download failed");
                self.inner.notify();
                self.schedule_removal(id, self.inner.config.error_grace());
            }
        }
    }

    /// Start every download concurrently and wait until each one has
    /// reached a terminal state. Ids are returned in input order.
    pub async fn download_multiple<I, S>(&self, items: I) -> Vec<DownloadId>
    where
        I: IntoIterator<Item = (Bytes, S)>,
        S: Into<String>,
    {
        let downloads = items
            .into_iter()
            .map(|(payload, filename)| self.download(payload, filename));
        join_all(downloads).await
    }

    /// Register `listener`; it receives the full task list on every change
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[DownloadTask]) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.inner.listeners.subscribe(listener)
    }

    /// Snapshot of every tracked task, oldest first
    pub fn get_tasks(&self) -> Vec<DownloadTask> {
        self.inner.snapshot()
    }

    pub fn get_task(&self, id: &DownloadId) -> Option<DownloadTask> {
        self.inner.tasks.lock().get(id).cloned()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Remove every completed task now, revoke its handle, and notify once
    pub fn clear_completed(&self) {
        let removed: Vec<DownloadTask> = {
            let mut tasks = self.inner.tasks.lock();
            let completed: Vec<DownloadId> = tasks
                .values()
                .filter(|task| task.status == DownloadStatus::Completed)
                .map(|task| task.id)
                .collect();
            completed
                .iter()
                .filter_map(|id| tasks.shift_remove(id))
                .collect()
        };

        for task in &removed {
            if let Some(timer) = self.inner.cleanups.lock().remove(&task.id) {
                timer.cancel();
            }
            self.inner.revoke(task);
        }

        debug!(removed = removed.len(), "completed downloads cleared");
        self.inner.notify();
    }

    fn schedule_removal(&self, id: DownloadId, delay: Duration) {
        let weak = Arc::downgrade(&self.inner);
        // Held across spawn so the timer cannot remove its entry before
        // it has been inserted.
        let mut cleanups = self.inner.cleanups.lock();
        let timer = DeferredTask::spawn(delay, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.cleanups.lock().remove(&id);
            if inner.remove(id) {
                inner.notify();
            }
        });
        cleanups.insert(id, timer);
    }
}

impl TrackerInner {
    async fn save(&self, id: DownloadId, payload: Bytes, filename: &str) -> Result<()> {
        let handle = self.handles.create(&payload)?;
        self.update(id, |task| task.handle = Some(handle.clone()));
        self.target.save(&handle, payload, filename).await
    }

    fn update<F>(&self, id: DownloadId, change: F)
    where
        F: FnOnce(&mut DownloadTask),
    {
        match self.tasks.lock().get_mut(&id) {
            Some(task) => change(task),
            None => debug!(download_id = %id, "update for untracked download ignored"),
        }
    }

    /// Remove a task and revoke its handle; false if it was already gone
    fn remove(&self, id: DownloadId) -> bool {
        let removed = self.tasks.lock().shift_remove(&id);
        match removed {
            Some(task) => {
                debug!(download_id = %id, status = %task.status, "download removed");
                self.revoke(&task);
                true
            }
            None => false,
        }
    }

    fn revoke(&self, task: &DownloadTask) {
        if let Some(handle) = &task.handle {
            self.handles.revoke(handle);
        }
    }

    fn snapshot(&self) -> Vec<DownloadTask> {
        self.tasks.lock().values().cloned().collect()
    }

    fn notify(&self) {
        let tasks = self.snapshot();
        self.listeners.notify(&tasks);
    }
}

impl std::fmt::Debug for DownloadTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadTracker")
            .field("tasks", &self.inner.tasks.lock().len())
            .field("listeners", &self.inner.listeners)
            .finish_non_exhaustive()
    }
}
