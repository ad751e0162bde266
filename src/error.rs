//! Unified error types.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Realtime error: {0}")]
    Realtime(#[from] RealtimeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Request-client errors.
///
/// Every failure of a single HTTP call lands in exactly one variant, so the UI
/// can report it without inspecting strings.
#[derive(Error, Debug)]
pub enum HttpError {
    /// No response was obtained (DNS, refused, reset, timeout).
    #[cfg(feature = "http")]
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with something that is not JSON (typically an HTML
    /// page from a misrouted gateway).
    #[error("Server returned HTML instead of JSON (status {status}). Check that the API is reachable.")]
    Protocol { status: u16 },

    /// A 2xx response whose body does not decode as the declared type.
    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    /// Non-2xx response. `detail` is the server's message, or the status phrase.
    #[error("{detail}")]
    Application { status: u16, detail: String },

    /// 401. The stored credential was rejected.
    #[error("Unauthorized: {detail}")]
    Unauthorized { detail: String },
}

impl HttpError {
    /// HTTP status associated with the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            #[cfg(feature = "http")]
            HttpError::Transport(e) => e.status().map(|s| s.as_u16()),
            HttpError::Protocol { status } | HttpError::Application { status, .. } => {
                Some(*status)
            }
            HttpError::Unauthorized { .. } => Some(401),
            HttpError::InvalidBody(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, HttpError::Unauthorized { .. })
    }
}

/// Realtime channel errors.
///
/// Carried by [`RealtimeEvent::Disconnected`](crate::realtime::RealtimeEvent)
/// rather than returned, since the manager recovers on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    /// The handshake did not complete (refused, timed out, rejected).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A frame that is not a `{type, data}` object. Logged and dropped.
    #[error("Malformed event: {0}")]
    Decode(String),

    #[error("Connection closed: code={code:?} reason={reason}")]
    Closed { code: Option<u16>, reason: String },
}

/// Persistent client-side storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage format error: {0}")]
    Serde(#[from] serde_json::Error),
}
