//! One-shot callbacks that run after a delay on the tokio runtime

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// A callback scheduled to run once after `delay`.
///
/// Dropping the handle does not cancel the callback; call [`cancel`]
/// to prevent it from firing.
///
/// [`cancel`]: DeferredTask::cancel
#[derive(Debug)]
pub struct DeferredTask {
    handle: JoinHandle<()>,
}

impl DeferredTask {
    /// Schedule `callback` to run after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        Self { handle }
    }

    /// Prevent the callback from running if it has not fired yet
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            debug!("deferred task cancelled before firing");
        }
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let task = DeferredTask::spawn(Duration::from_secs(3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(2_999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_callback() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let task = DeferredTask::spawn(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        task.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
