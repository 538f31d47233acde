//! Deferred units of work accepted by the queue

use futures::future::BoxFuture;
use futures::FutureExt;
use idoc_core::{Error, Result};
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;

type TaskBody = Box<dyn FnOnce() -> BoxFuture<'static, std::result::Result<(), String>> + Send>;

/// A zero-argument asynchronous job whose result is discarded.
///
/// Nothing runs until the queue invokes it.
pub struct QueuedTask {
    label: String,
    body: TaskBody,
}

impl QueuedTask {
    /// Wrap `job`; the label only appears in logs
    pub fn new<F, Fut, T, E>(label: impl Into<String>, job: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Display,
    {
        let body: TaskBody = Box::new(move || {
            async move { job().await.map(|_| ()).map_err(|e| e.to_string()) }.boxed()
        });
        Self {
            label: label.into(),
            body,
        }
    }

    /// Wrap a job that cannot fail
    pub fn infallible<F, Fut>(label: impl Into<String>, job: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
    {
        Self::new(label, move || async move {
            job().await;
            Ok::<(), std::convert::Infallible>(())
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the job to completion. Panics inside the job become errors.
    pub(crate) async fn run(self) -> Result<()> {
        let QueuedTask { label, body } = self;
        match AssertUnwindSafe(body()).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(Error::task(label, message)),
            Err(panic) => Err(Error::task(label, panic_message(panic.as_ref()))),
        }
    }
}

impl std::fmt::Debug for QueuedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedTask")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
