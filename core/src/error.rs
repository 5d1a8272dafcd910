//! Error types for the bookshelf API client.
//!
//! # Design
//! Callers only ever see `ApiError`: a kind (auth or fetch) plus one
//! human-readable message. Everything that can go wrong underneath is first
//! captured as a `Failure` and then collapsed by `normalize`, a total match
//! over the failure cases. The raw cause is logged, never surfaced.

use serde_json::Value;
use thiserror::Error;

/// Message used when the backend answered without a usable `message` field.
pub const RESPONSE_FALLBACK: &str = "An error occurred";

/// Message used for auth calls that failed without any backend response.
pub const UNKNOWN_FALLBACK: &str = "An unknown error occurred";

/// Which family of call failed. Decides the fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Login and register.
    Auth,
    /// Book list, create and delete.
    Fetch,
}

impl ErrorKind {
    /// Fallback for failures that carry no backend response at all.
    pub fn unknown_fallback(self) -> &'static str {
        match self {
            ErrorKind::Auth => UNKNOWN_FALLBACK,
            ErrorKind::Fetch => RESPONSE_FALLBACK,
        }
    }

    pub fn error(self, message: impl Into<String>) -> ApiError {
        let message = message.into();
        match self {
            ErrorKind::Auth => ApiError::Auth { message },
            ErrorKind::Fetch => ApiError::Fetch { message },
        }
    }
}

/// Normalized error returned by every client operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Login or register failed.
    #[error("{message}")]
    Auth { message: String },

    /// A book resource call failed.
    #[error("{message}")]
    Fetch { message: String },
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::Auth { message } | ApiError::Fetch { message } => message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Auth { .. } => ErrorKind::Auth,
            ApiError::Fetch { .. } => ErrorKind::Fetch,
        }
    }
}

/// The request never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("transport task failed: {0}")]
    Task(String),
}

/// Everything that can go wrong before normalization.
#[derive(Debug, Error)]
pub enum Failure {
    /// The backend answered with a non-2xx status.
    #[error("backend returned HTTP {status}")]
    Backend { status: u16, body: Vec<u8> },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A 2xx response whose body is not the expected JSON.
    #[error("could not decode response: {0}")]
    Decode(serde_json::Error),

    /// The request payload could not be serialized.
    #[error("could not encode request: {0}")]
    Encode(serde_json::Error),
}

/// Collapse a failure into the single-message error callers see.
pub fn normalize(kind: ErrorKind, failure: Failure) -> ApiError {
    let message = match &failure {
        Failure::Backend { body, .. } => {
            backend_message(body).unwrap_or_else(|| RESPONSE_FALLBACK.to_string())
        }
        Failure::Transport(_) | Failure::Decode(_) | Failure::Encode(_) => {
            kind.unknown_fallback().to_string()
        }
    };
    tracing::warn!(?kind, cause = %failure, %message, "request failed");
    kind.error(message)
}

/// Extract a non-empty string `message` from a JSON error body.
fn backend_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(status: u16, body: &str) -> Failure {
        Failure::Backend {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn backend_message_is_used_verbatim() {
        let err = normalize(ErrorKind::Auth, backend(400, r#"{"message":"Username or password incorrect!"}"#));
        assert_eq!(err, ApiError::Auth { message: "Username or password incorrect!".to_string() });
    }

    #[test]
    fn backend_without_message_falls_back() {
        let err = normalize(ErrorKind::Auth, backend(500, "<html>oops</html>"));
        assert_eq!(err.message(), RESPONSE_FALLBACK);

        let err = normalize(ErrorKind::Fetch, backend(500, r#"{"error":"boom"}"#));
        assert_eq!(err.message(), RESPONSE_FALLBACK);
    }

    #[test]
    fn empty_or_non_string_message_falls_back() {
        let err = normalize(ErrorKind::Fetch, backend(400, r#"{"message":""}"#));
        assert_eq!(err.message(), RESPONSE_FALLBACK);

        let err = normalize(ErrorKind::Fetch, backend(400, r#"{"message":42}"#));
        assert_eq!(err.message(), RESPONSE_FALLBACK);
    }

    #[test]
    fn transport_failure_uses_kind_specific_fallback() {
        let auth = normalize(
            ErrorKind::Auth,
            TransportError::Request("connection refused".to_string()).into(),
        );
        assert_eq!(auth.message(), UNKNOWN_FALLBACK);

        let fetch = normalize(
            ErrorKind::Fetch,
            TransportError::Request("connection refused".to_string()).into(),
        );
        assert_eq!(fetch.message(), RESPONSE_FALLBACK);
    }

    #[test]
    fn transport_detail_never_reaches_message() {
        let err = normalize(
            ErrorKind::Fetch,
            TransportError::Request("dns error: no such host".to_string()).into(),
        );
        assert!(!err.to_string().contains("dns"));
    }

    #[test]
    fn display_is_the_message() {
        let err = ErrorKind::Fetch.error("Book not found");
        assert_eq!(err.to_string(), "Book not found");
        assert_eq!(err.kind(), ErrorKind::Fetch);
    }
}
