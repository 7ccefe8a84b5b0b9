//! Error types for the client library.

use thiserror::Error;

/// Failure of a single call to the SearchService.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the connection failed.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: u16,
        /// Raw response body, kept for error-detail extraction.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// A local file could not be read (upload source).
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A convenience result type for service calls.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Why an upload did not produce a dataset. `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Dataset name is required")]
    NameRequired,

    #[error("Please select a file")]
    FileRequired,

    #[error("Please enter some text data")]
    TextRequired,

    /// The request failed. Carries the service's `detail`, a local I/O
    /// message, or [`UploadError::GENERIC`].
    #[error("{0}")]
    Failed(String),
}

impl UploadError {
    pub const GENERIC: &'static str = "Upload failed";

    /// True for failures caught before any request was sent.
    pub fn is_validation(&self) -> bool {
        !matches!(self, UploadError::Failed(_))
    }
}

/// Message shown when a search fails for any reason.
pub const SEARCH_FAILED: &str = "Search failed";
