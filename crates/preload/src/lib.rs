//! Preloading and application wiring for idoc
//!
//! - **`backend`**: the `DocumentBackend` collaborator and its data types,
//!   plus a JSON fixture implementation.
//! - **`preloader`**: one `ensure_*_loaded` variant per data source, typed
//!   readers, and idle-time prefetching of a user's data.
//! - **`context`**: `AppContext`, built once at startup, owning the cache,
//!   queue, download tracker and preloader.

pub mod backend;
pub mod context;
pub mod preloader;

pub use backend::{DocumentBackend, DocumentSummary, JsonDirBackend, Profile, Template};
pub use context::{AppContext, AppContextBuilder};
pub use preloader::{profile_key, recent_documents_key, Preloader};
