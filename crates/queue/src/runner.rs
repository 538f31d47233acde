//! Sequential drain loop over a FIFO of queued tasks
//!
//! The runner is either idle or draining. Enqueueing while idle spawns the
//! single drain process; enqueueing while draining only appends. The drain
//! process pops the head task, awaits it, logs a failure if there was one,
//! and goes back to idle once the queue is empty.

use crate::idle::{FallbackDelay, IdleScheduler};
use crate::task::QueuedTask;
use idoc_core::config::QueueConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Background task queue, cheap to clone and share
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    /// `true` while no drain process is running
    idle_tx: watch::Sender<bool>,
    scheduler: Arc<dyn IdleScheduler>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedTask>,
    draining: bool,
}

impl TaskQueue {
    pub fn new(scheduler: Arc<dyn IdleScheduler>) -> Self {
        let (idle_tx, _) = watch::channel(true);
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                idle_tx,
                scheduler,
            }),
        }
    }

    /// Queue whose idle prefetches fall back to the configured delay
    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(Arc::new(FallbackDelay::new(config.idle_fallback())))
    }

    /// Append `task` and start draining if the queue was idle.
    ///
    /// Returns immediately. Must be called within a tokio runtime.
    pub fn add_to_queue(&self, task: QueuedTask) {
        self.add_all(std::iter::once(task));
    }

    /// Append several tasks at once, preserving their order
    pub fn add_all(&self, tasks: impl IntoIterator<Item = QueuedTask>) {
        let start_drain = {
            let mut state = self.inner.state.lock();
            let before = state.pending.len();
            state.pending.extend(tasks);
            let added = state.pending.len() - before;
            debug!(added, queued = state.pending.len(), "tasks enqueued");

            if state.draining || state.pending.is_empty() {
                false
            } else {
                state.draining = true;
                self.inner.idle_tx.send_replace(false);
                true
            }
        };

        if start_drain {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(QueueInner::drain(inner));
        }
    }

    /// Enqueue `tasks` together once the host is idle
    pub fn prefetch_when_idle(&self, tasks: Vec<QueuedTask>) {
        if tasks.is_empty() {
            return;
        }
        debug!(count = tasks.len(), "prefetch scheduled for idle time");
        let queue = self.clone();
        self.inner
            .scheduler
            .run_when_idle(Box::new(move || queue.add_all(tasks)));
    }

    /// Number of tasks waiting to start (the running task is not counted)
    pub fn len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_idle(&self) -> bool {
        !self.inner.state.lock().draining
    }

    /// Resolve once the drain process has returned to idle.
    ///
    /// Returns immediately if nothing is draining, including when a
    /// prefetch is still waiting for idle time.
    pub async fn wait_idle(&self) {
        let mut idle_rx = self.inner.idle_tx.subscribe();
        let _ = idle_rx.wait_for(|idle| *idle).await;
    }
}

impl QueueInner {
    async fn drain(inner: Arc<QueueInner>) {
        debug!("queue draining");
        loop {
            let next = {
                let mut state = inner.state.lock();
                match state.pending.pop_front() {
                    Some(task) => task,
                    None => {
                        state.draining = false;
                        inner.idle_tx.send_replace(true);
                        break;
                    }
                }
            };

            let label = next.label().to_string();
            debug!(task = %label, "running queued task");
            if let Err(e) = next.run().await {
                warn!(task = %label, error = %e, "Background task failed");
            }
        }
        debug!("queue idle");
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TaskQueue")
            .field("pending", &state.pending.len())
            .field("draining", &state.draining)
            .finish_non_exhaustive()
    }
}
