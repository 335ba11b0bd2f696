use std::time::Duration;
use thiserror::Error;

/// Error taxonomy for a capture run.
///
/// Validation errors surface synchronously at registration time, before any
/// network activity. Every other kind aborts the whole in-flight run; partial
/// result sets are never returned.
#[derive(Debug, Error)]
pub enum PagesnapError {
    #[error("URL required")]
    UrlRequired,

    #[error("Sizes required")]
    SizesRequired,

    #[error("Directory required")]
    DirectoryRequired,

    #[error("unknown device keyword: {0}")]
    UnknownKeyword(String),

    #[error("size lookup failed: {0}")]
    LookupFailed(String),

    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("capture of {url} at {size} timed out after {timeout:?}")]
    CaptureTimeout {
        url: String,
        size: String,
        timeout: Duration,
    },

    #[error("authentication failed for {url}")]
    AuthenticationFailed { url: String },

    #[error("no element matching selector `{selector}` on {url}")]
    SelectorNotFound { url: String, selector: String },

    #[error("capture of {url} at {size} failed: {reason}")]
    CaptureFailed {
        url: String,
        size: String,
        reason: String,
    },

    #[error("invalid size token: {0}")]
    InvalidSize(String),

    #[error("invalid filename template: {0}")]
    Template(String),

    #[error("write failed: {0}")]
    Persistence(String),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl PagesnapError {
    /// Whether this error was raised before any capture work started.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PagesnapError::UrlRequired
                | PagesnapError::SizesRequired
                | PagesnapError::DirectoryRequired
        )
    }
}

impl From<std::io::Error> for PagesnapError {
    fn from(err: std::io::Error) -> Self {
        PagesnapError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for PagesnapError {
    fn from(err: serde_json::Error) -> Self {
        PagesnapError::LookupFailed(err.to_string())
    }
}

impl From<reqwest::Error> for PagesnapError {
    fn from(err: reqwest::Error) -> Self {
        PagesnapError::LookupFailed(err.to_string())
    }
}
