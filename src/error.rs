use std::time::Duration;
use thiserror::Error;

/// Top-level error taxonomy for schema generation.
///
/// Validation errors block the action before any network activity; fetch,
/// API and parse errors are reported per item in batch mode and surface
/// directly in single-shot mode.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed user input (URL, credential, CSV header)
    #[error("{0}")]
    Validation(String),

    /// Page could not be loaded or its content extracted
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// Non-success response from the generative-AI endpoint
    #[error("{0}")]
    Api(String),

    /// The model reply did not contain a parseable JSON object
    #[error("{0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the page fetching layer
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timeout: page took longer than {0:?} to load")]
    Timeout(Duration),

    #[error("Cannot access this URL type ({0} URLs are not allowed)")]
    BlockedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("browser window was closed before content could be extracted")]
    WindowClosed,

    #[error("WebDriver command failed: {0}")]
    WebDriver(fantoccini::error::CmdError),

    #[error("failed to connect to WebDriver: {0}")]
    Connect(#[from] fantoccini::error::NewSessionError),
}

impl Error {
    /// True when the error should block an action without offering a retry
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<fantoccini::error::CmdError> for FetchError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        // The window can disappear under us mid-fetch (user closed the
        // browser, session torn down); distinguish that from other
        // command failures
        if e.to_string().contains("no such window") {
            FetchError::WindowClosed
        } else {
            FetchError::WebDriver(e)
        }
    }
}
