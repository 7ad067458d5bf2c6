use crate::beatmap::Backend;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the resolver, the download manager and placement
#[derive(Error, Debug)]
pub enum Error {
    /// The active backend cannot serve this filter combination
    #[error("Search not supported by the {backend} backend: {reason}")]
    SearchUnsupported { backend: Backend, reason: String },

    /// Official content withdrawn (takedown); a mirror may still carry it
    #[error("Beatmap set {set_id} is no longer downloadable from the official servers")]
    IllegalDownload { set_id: u64 },

    /// A transfer for the same (backend, set id) is already registered
    #[error("Beatmap set {set_id} is already being downloaded from the {backend} backend")]
    AlreadyInProgress { backend: Backend, set_id: u64 },

    /// Resolution yielded nothing
    #[error("Could not find beatmap set {set_id} on the {backend} backend")]
    NotFound { backend: Backend, set_id: u64 },

    /// Transport or I/O failure during the byte transfer
    #[error("Failed to download {title} from the {backend} backend: {message}")]
    TransferFailed {
        title: String,
        backend: Backend,
        temp_path: PathBuf,
        message: String,
    },

    /// The user cancelled the transfer
    #[error("Download of {title} was cancelled")]
    Cancelled { title: String },

    /// Search or resolve request failed (network, status, decode)
    #[error("{backend} backend request failed: {message}")]
    Backend { backend: Backend, message: String },

    /// Moving the finished file into place failed
    #[error("Failed to place {path}: {source}")]
    Placement {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a backend request error
    pub fn backend(backend: Backend, message: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            message: message.into(),
        }
    }

    /// Create a placement error
    pub fn placement(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Placement {
            path: path.into(),
            source,
        }
    }

    /// True for the user-directed cancellation outcome
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether the caller can recover by choosing differently (filters, backend)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SearchUnsupported { .. }
                | Self::IllegalDownload { .. }
                | Self::AlreadyInProgress { .. }
                | Self::NotFound { .. }
                | Self::Cancelled { .. }
        )
    }
}
