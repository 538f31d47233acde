//! "Run when idle" scheduling capability
//!
//! The queue never detects idleness itself. Hosts inject an
//! [`IdleScheduler`]: [`HostIdle`] when they can signal idleness,
//! [`FallbackDelay`] when they cannot, and [`Immediate`] in tests.

use idoc_utils::DeferredTask;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

pub type IdleCallback = Box<dyn FnOnce() + Send + 'static>;

/// Runs a callback at the next point the host is idle
pub trait IdleScheduler: Send + Sync {
    fn run_when_idle(&self, callback: IdleCallback);
}

/// Runs the callback after a fixed delay
#[derive(Debug, Clone)]
pub struct FallbackDelay {
    delay: Duration,
}

impl FallbackDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FallbackDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(idoc_core::DEFAULT_IDLE_FALLBACK_MS))
    }
}

impl IdleScheduler for FallbackDelay {
    fn run_when_idle(&self, callback: IdleCallback) {
        debug!(delay_ms = self.delay.as_millis() as u64, "idle fallback scheduled");
        // Not cancelable; the handle is dropped on purpose.
        let _ = DeferredTask::spawn(self.delay, callback);
    }
}

/// Runs the callback synchronously
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl IdleScheduler for Immediate {
    fn run_when_idle(&self, callback: IdleCallback) {
        callback();
    }
}

/// Handle the host uses to announce that it is idle
#[derive(Debug, Clone, Default)]
pub struct IdleSignal {
    notify: Arc<Notify>,
}

impl IdleSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release every callback currently waiting for idleness
    pub fn notify_idle(&self) {
        self.notify.notify_waiters();
    }
}

/// Waits for the host's idle signal, or `timeout`, whichever comes first
#[derive(Debug, Clone)]
pub struct HostIdle {
    signal: IdleSignal,
    timeout: Duration,
}

impl HostIdle {
    pub fn new(signal: IdleSignal, timeout: Duration) -> Self {
        Self { signal, timeout }
    }
}

impl IdleScheduler for HostIdle {
    fn run_when_idle(&self, callback: IdleCallback) {
        let timeout = self.timeout;
        // Register interest before spawning so a signal sent right after
        // this call is not missed.
        let notified = Arc::clone(&self.signal.notify).notified_owned();
        tokio::spawn(async move {
            tokio::select! {
                _ = notified => debug!("host reported idle"),
                _ = tokio::time::sleep(timeout) => debug!("idle timeout reached"),
            }
            callback();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn flag_callback(flag: &Arc<AtomicBool>) -> IdleCallback {
        let flag = Arc::clone(flag);
        Box::new(move || flag.store(true, Ordering::SeqCst))
    }

    #[test]
    fn test_immediate_runs_inline() {
        let ran = Arc::new(AtomicBool::new(false));
        Immediate.run_when_idle(flag_callback(&ran));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_delay_waits() {
        let ran = Arc::new(AtomicBool::new(false));
        FallbackDelay::default().run_when_idle(flag_callback(&ran));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(!ran.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_idle_signal_wins_over_timeout() {
        let signal = IdleSignal::new();
        let scheduler = HostIdle::new(signal.clone(), Duration::from_secs(10));
        let ran = Arc::new(AtomicBool::new(false));

        scheduler.run_when_idle(flag_callback(&ran));
        signal.notify_idle();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_idle_times_out() {
        let scheduler = HostIdle::new(IdleSignal::new(), Duration::from_millis(500));
        let ran = Arc::new(AtomicBool::new(false));

        scheduler.run_when_idle(flag_callback(&ran));
        tokio::time::sleep(Duration::from_millis(501)).await;

        assert!(ran.load(Ordering::SeqCst));
    }
}
