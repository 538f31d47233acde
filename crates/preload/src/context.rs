//! Process-wide services, constructed once at startup and passed by reference

use crate::backend::DocumentBackend;
use crate::preloader::Preloader;
use idoc_cache::CacheStore;
use idoc_core::{Error, IdocConfig, Result};
use idoc_download::{DownloadTracker, HandleRegistry, MemoryHandleRegistry, SaveTarget};
use idoc_queue::{IdleScheduler, TaskQueue};
use std::sync::Arc;
use tracing::info;

/// Shared application services.
///
/// Every field is a cheap-to-clone handle onto shared state, so cloning
/// the context hands out the same cache, queue and tracker.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Arc<IdocConfig>,
    pub cache: CacheStore,
    pub queue: TaskQueue,
    pub downloads: DownloadTracker,
    pub preloader: Preloader,
}

impl AppContext {
    pub fn builder(config: IdocConfig) -> AppContextBuilder {
        AppContextBuilder::new(config)
    }
}

/// Builder for [`AppContext`]
///
/// A backend and a save target are required. The handle registry defaults
/// to [`MemoryHandleRegistry`] and the idle scheduler to a
/// [`idoc_queue::FallbackDelay`] using the configured fallback.
pub struct AppContextBuilder {
    config: IdocConfig,
    backend: Option<Arc<dyn DocumentBackend>>,
    handles: Option<Arc<dyn HandleRegistry>>,
    save_target: Option<Arc<dyn SaveTarget>>,
    idle_scheduler: Option<Arc<dyn IdleScheduler>>,
}

impl AppContextBuilder {
    pub fn new(config: IdocConfig) -> Self {
        Self {
            config,
            backend: None,
            handles: None,
            save_target: None,
            idle_scheduler: None,
        }
    }

    pub fn backend(mut self, backend: Arc<dyn DocumentBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn handles(mut self, handles: Arc<dyn HandleRegistry>) -> Self {
        self.handles = Some(handles);
        self
    }

    pub fn save_target(mut self, target: Arc<dyn SaveTarget>) -> Self {
        self.save_target = Some(target);
        self
    }

    pub fn idle_scheduler(mut self, scheduler: Arc<dyn IdleScheduler>) -> Self {
        self.idle_scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> Result<AppContext> {
        self.config.validate()?;

        let backend = self
            .backend
            .ok_or_else(|| Error::configuration("no document backend configured"))?;
        let target = self
            .save_target
            .ok_or_else(|| Error::configuration("no save target configured"))?;
        let handles = self
            .handles
            .unwrap_or_else(|| Arc::new(MemoryHandleRegistry::new()));
        let queue = match self.idle_scheduler {
            Some(scheduler) => TaskQueue::new(scheduler),
            None => TaskQueue::from_config(&self.config.queue),
        };

        let cache = CacheStore::new();
        let downloads = DownloadTracker::new(handles, target, self.config.download.clone());
        let preloader = Preloader::new(
            cache.clone(),
            queue.clone(),
            backend,
            &self.config.preload,
        );

        info!(source = ?self.config.source, "application context ready");

        Ok(AppContext {
            config: Arc::new(self.config),
            cache,
            queue,
            downloads,
            preloader,
        })
    }
}

impl std::fmt::Debug for AppContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContextBuilder")
            .field("config", &self.config)
            .field("backend", &self.backend.is_some())
            .field("handles", &self.handles.is_some())
            .field("save_target", &self.save_target.is_some())
            .field("idle_scheduler", &self.idle_scheduler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::JsonDirBackend;
    use idoc_core::IdocConfigBuilder;
    use idoc_download::DirectorySaveTarget;
    use tempfile::TempDir;

    #[test]
    fn test_build_requires_backend_and_target() {
        let err = AppContextBuilder::new(IdocConfig::default())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("backend"));

        let temp_dir = TempDir::new().unwrap();
        let err = AppContextBuilder::new(IdocConfig::default())
            .backend(Arc::new(JsonDirBackend::new(temp_dir.path())))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("save target"));
    }

    #[tokio::test]
    async fn test_context_shares_one_cache() {
        let temp_dir = TempDir::new().unwrap();
        let config = IdocConfigBuilder::new()
            .with_recent_documents_limit(5)
            .build()
            .unwrap();

        let context = AppContext::builder(config)
            .backend(Arc::new(JsonDirBackend::new(temp_dir.path())))
            .save_target(Arc::new(DirectorySaveTarget::new(temp_dir.path())))
            .build()
            .unwrap();

        context.cache.set("templates", Vec::<crate::Template>::new());
        assert!(context.preloader.templates().is_some());
        assert!(context.preloader.cache().has("templates"));
        assert_eq!(context.config.preload.recent_documents_limit, 5);
    }
}
