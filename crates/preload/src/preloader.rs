//! Cache population for templates, profiles and recent documents

use crate::backend::{DocumentBackend, DocumentSummary, Profile, Template};
use idoc_cache::CacheStore;
use idoc_core::config::PreloadConfig;
use idoc_core::{PROFILE_CACHE_KEY_PREFIX, RECENT_DOCUMENTS_CACHE_KEY_PREFIX, TEMPLATES_CACHE_KEY};
use idoc_queue::{QueuedTask, TaskQueue};
use std::sync::Arc;
use tracing::debug;

pub fn profile_key(user_id: &str) -> String {
    format!("{PROFILE_CACHE_KEY_PREFIX}{user_id}")
}

pub fn recent_documents_key(user_id: &str) -> String {
    format!("{RECENT_DOCUMENTS_CACHE_KEY_PREFIX}{user_id}")
}

/// Loads backend data into the cache, on demand or in the background
#[derive(Clone)]
pub struct Preloader {
    cache: CacheStore,
    queue: TaskQueue,
    backend: Arc<dyn DocumentBackend>,
    recent_documents_limit: usize,
}

impl Preloader {
    pub fn new(
        cache: CacheStore,
        queue: TaskQueue,
        backend: Arc<dyn DocumentBackend>,
        config: &PreloadConfig,
    ) -> Self {
        Self {
            cache,
            queue,
            backend,
            recent_documents_limit: config.recent_documents_limit,
        }
    }

    pub async fn ensure_templates_loaded(&self) {
        let backend = Arc::clone(&self.backend);
        self.cache
            .ensure_loaded(TEMPLATES_CACHE_KEY, move || async move {
                backend.fetch_templates().await
            })
            .await;
    }

    pub async fn ensure_profile_loaded(&self, user_id: &str) {
        let backend = Arc::clone(&self.backend);
        let id = user_id.to_string();
        self.cache
            .ensure_loaded(&profile_key(user_id), move || async move {
                backend.fetch_profile(&id).await
            })
            .await;
    }

    pub async fn ensure_recent_documents_loaded(&self, user_id: &str) {
        let backend = Arc::clone(&self.backend);
        let id = user_id.to_string();
        let limit = self.recent_documents_limit;
        self.cache
            .ensure_loaded(&recent_documents_key(user_id), move || async move {
                backend.fetch_recent_documents(&id, limit).await
            })
            .await;
    }

    pub fn templates(&self) -> Option<Arc<Vec<Template>>> {
        self.cache.get(TEMPLATES_CACHE_KEY)
    }

    pub fn profile(&self, user_id: &str) -> Option<Arc<Profile>> {
        self.cache.get(&profile_key(user_id))
    }

    pub fn recent_documents(&self, user_id: &str) -> Option<Arc<Vec<DocumentSummary>>> {
        self.cache.get(&recent_documents_key(user_id))
    }

    /// Queue loads of templates, profile and recent documents for idle time
    pub fn prefetch_user_data(&self, user_id: &str) {
        debug!(user_id = %user_id, "prefetching user data when idle");

        let templates = self.clone();
        let profile = self.clone();
        let documents = self.clone();
        let profile_user = user_id.to_string();
        let documents_user = user_id.to_string();

        self.queue.prefetch_when_idle(vec![
            QueuedTask::infallible(TEMPLATES_CACHE_KEY, move || async move {
                templates.ensure_templates_loaded().await
            }),
            QueuedTask::infallible(profile_key(user_id), move || async move {
                profile.ensure_profile_loaded(&profile_user).await
            }),
            QueuedTask::infallible(recent_documents_key(user_id), move || async move {
                documents.ensure_recent_documents_loaded(&documents_user).await
            }),
        ]);
    }

    /// Drop the cached profile and recent documents of `user_id`
    pub fn invalidate_user(&self, user_id: &str) {
        self.cache.invalidate(&profile_key(user_id));
        self.cache.invalidate(&recent_documents_key(user_id));
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }
}

impl std::fmt::Debug for Preloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preloader")
            .field("cache", &self.cache)
            .field("queue", &self.queue)
            .field("recent_documents_limit", &self.recent_documents_limit)
            .finish_non_exhaustive()
    }
}
