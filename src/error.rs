//! Error types for bindery operations.

use thiserror::Error;

/// Errors that can occur while transforming chapter content or packaging
/// an EPUB.
#[derive(Error, Debug)]
pub enum Error {
    /// The expected content container is missing or the document is unusable.
    /// Fatal for the current chapter; the caller decides whether to abort
    /// the whole book.
    #[error("content corrupted: {0}")]
    ContentCorrupted(String),

    /// A sampled session check matched a blocked/logged-out page. The caller
    /// should re-authenticate rather than retry blindly.
    #[error("blocked page detected; the session is no longer authenticated")]
    AntiBotDetected,

    /// A registered stylesheet or image could not be retrieved.
    #[error("asset unavailable: {0}")]
    AssetUnavailable(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;
