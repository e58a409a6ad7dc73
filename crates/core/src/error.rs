//! Unified error types for the offline layer.
//!
//! Every variant renders with a stable upper-case code prefix so log lines
//! and tool errors can be matched without parsing the free-form message.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type shared by the store, cache, fetch and worker layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No stored record for the given URL.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A payload or header set could not be (de)serialized.
    #[error("STORE_ERROR: serialization failed: {0}")]
    Serialization(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The request never produced a response (connection refused, DNS, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// A core asset could not be cached while installing a worker.
    #[error("PREWARM_FAILED: {url}: {reason}")]
    PrewarmFailed { url: String, reason: String },

    /// A lifecycle operation was attempted from the wrong state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// Network failed and no cached copy exists.
    #[error("OFFLINE: {0}")]
    Offline(String),
}

impl Error {
    /// Whether this error means the network could not be used for a request.
    ///
    /// Strategies treat all of these as "network unavailable".
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_) | Error::HttpError(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Serialization(msg) => (-32002, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::Network(msg) => (-32004, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::PrewarmFailed { .. } => (-32009, err.to_string()),
            Error::InvalidState(msg) => (-32010, msg.clone()),
            Error::Offline(msg) => (-32011, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("https://www.omdbapi.com/?s=alien".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("s=alien"));
    }

    #[test]
    fn test_prewarm_display() {
        let err = Error::PrewarmFailed { url: "http://localhost:3000/offline".into(), reason: "status 404".into() };
        assert_eq!(err.to_string(), "PREWARM_FAILED: http://localhost:3000/offline: status 404");
    }

    #[test]
    fn test_is_network() {
        assert!(Error::Network("refused".into()).is_network());
        assert!(Error::FetchTimeout("20s".into()).is_network());
        assert!(Error::HttpError("status 503".into()).is_network());
        assert!(!Error::CacheMiss("x".into()).is_network());
        assert!(!Error::InvalidUrl("x".into()).is_network());
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::CacheMiss("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let err = Error::Offline("no fallback".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32011);
    }
}
