//! Backend data source consumed by the preloader

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idoc_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// A document template offered in the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub credits: u32,
    #[serde(default)]
    pub subscription_status: Option<String>,
}

/// Lightweight listing entry for a user's document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub template_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Source of the data the preloader caches.
///
/// `Ok(None)` means the backend answered but had nothing usable.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn fetch_templates(&self) -> Result<Option<Vec<Template>>>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Most recently updated documents first, at most `limit`
    async fn fetch_recent_documents(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Option<Vec<DocumentSummary>>>;
}

/// Reads `templates.json`, `profiles.json` and `documents.json` from a
/// directory. A missing file is "no data", not an error.
#[derive(Debug, Clone)]
pub struct JsonDirBackend {
    dir: PathBuf,
}

impl JsonDirBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read_array<T: DeserializeOwned>(&self, name: &str) -> Result<Option<Vec<T>>> {
        let path = self.dir.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "fixture file missing");
                Ok(None)
            }
            Err(e) => Err(Error::file_system(path, "read fixture", e)),
        }
    }
}

#[async_trait]
impl DocumentBackend for JsonDirBackend {
    async fn fetch_templates(&self) -> Result<Option<Vec<Template>>> {
        self.read_array("templates.json").await
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let profiles: Option<Vec<Profile>> = self.read_array("profiles.json").await?;
        Ok(profiles.and_then(|profiles| profiles.into_iter().find(|p| p.id == user_id)))
    }

    async fn fetch_recent_documents(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Option<Vec<DocumentSummary>>> {
        let documents: Option<Vec<DocumentSummary>> = self.read_array("documents.json").await?;
        Ok(documents.map(|documents| {
            let mut owned: Vec<DocumentSummary> = documents
                .into_iter()
                .filter(|d| d.owner_id == user_id)
                .collect();
            owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            owned.truncate(limit);
            owned
        }))
    }
}
