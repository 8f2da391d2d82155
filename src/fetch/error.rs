//! Errors produced while fetching from the content API

use thiserror::Error;

/// Errors that can occur when fetching content
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, refused connection, timeout)
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("HTTP error {status}: {status_text}")]
    Http { status: u16, status_text: String },

    /// A 2xx response whose JSON body was empty
    #[error("response contained no data")]
    EmptyResponse,

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The body parsed but was rejected by the validator on every cycle
    #[error("response from {url} failed validation")]
    ValidationFailed { url: String },

    /// Every attempt failed; `last` is the final cause
    #[error("gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Creates a transport error from any message
    pub fn transport(message: impl Into<String>) -> Self {
        FetchError::Transport(message.into())
    }

    /// Follows `RetryExhausted` wrappers down to the underlying cause
    pub fn root(&self) -> &FetchError {
        match self {
            FetchError::RetryExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// HTTP status of the underlying cause, if it was an HTTP error
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        FetchError::Transport(error.to_string())
    }
}
