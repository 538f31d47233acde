use std::path::PathBuf;

/// Result type alias for idoc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for idoc operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// A loader did not produce a value for a cache key
    #[error("failed to load '{key}': {message}")]
    Load { key: String, message: String },

    /// A background task failed
    #[error("task '{label}' failed: {message}")]
    Task { label: String, message: String },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a load error for a cache key
    #[must_use]
    pub fn load(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Load {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a task failure error
    #[must_use]
    pub fn task(label: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Task {
            label: label.into(),
            message: message.into(),
        }
    }
}
