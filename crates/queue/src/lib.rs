//! Background task queue for idoc
//!
//! Runs deferred asynchronous jobs one at a time in FIFO order without
//! blocking the submitter. Failing jobs are logged and skipped. Batches can
//! be handed to the queue once the host reports it is idle.

pub mod idle;
pub mod runner;
pub mod task;

pub use idle::{FallbackDelay, HostIdle, IdleCallback, IdleScheduler, IdleSignal, Immediate};
pub use runner::TaskQueue;
pub use task::QueuedTask;
