use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XrpcError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid header {0}")]
    InvalidHeader(String),

    #[error("no active session for {nsid}")]
    MissingSession { nsid: &'static str },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("XRPC {nsid} failed with HTTP {status}: {message}")]
    Status {
        nsid: &'static str,
        status: StatusCode,
        /// Machine-readable error name from the response body, when present.
        error: Option<String>,
        message: String,
    },

    #[error("failed to decode {nsid} response: {source}")]
    Decode {
        nsid: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl XrpcError {
    /// HTTP status of a remote rejection.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }

    /// True when the server answered with a 5xx status.
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_server_error())
    }

    /// True when the server answered with a non-success status.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// True when no HTTP response was obtained (connect, DNS, timeout).
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Request(error) => error.is_connect() || error.is_timeout(),
            _ => false,
        }
    }
}

/// XRPC error body: `{"error": "InvalidToken", "message": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Decode a non-success response body into `(error name, message)`.
///
/// Falls back to the raw body, then to the canonical status reason, when the
/// body does not follow the XRPC error shape.
pub fn parse_error_body(status: StatusCode, body: &str) -> (Option<String>, String) {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    let Ok(parsed) = serde_json::from_str::<ErrorPayload>(body) else {
        return (None, fallback());
    };

    let error = parsed.error.as_deref().and_then(non_empty_string).map(str::to_owned);
    let message = parsed
        .message
        .as_deref()
        .and_then(non_empty_string)
        .map(str::to_owned)
        .or_else(|| error.clone())
        .unwrap_or_else(fallback);
    (error, message)
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
