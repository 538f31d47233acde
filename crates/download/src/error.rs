/// Result type for download operations
pub type Result<T> = std::result::Result<T, DownloadError>;

/// Ways a save attempt can fail. The display text becomes the task's
/// error message, so `Save` shows the platform message verbatim.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The platform save primitive reported a failure
    #[error("{message}")]
    Save { message: String },

    /// A transient handle could not be created for the payload
    #[error("failed to create resource handle: {message}")]
    Handle { message: String },

    /// The target filename has no usable final component
    #[error("invalid filename '{filename}'")]
    InvalidFilename { filename: String },

    #[error(transparent)]
    Core(#[from] idoc_core::Error),
}

impl DownloadError {
    #[must_use]
    pub fn save(message: impl Into<String>) -> Self {
        DownloadError::Save {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn handle(message: impl Into<String>) -> Self {
        DownloadError::Handle {
            message: message.into(),
        }
    }
}
