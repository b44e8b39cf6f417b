use atproto_api::XrpcError;
use reqwest::StatusCode;
use thiserror::Error;

/// Login or session-validation failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid server address {server}: {source}")]
    InvalidServer {
        server: String,
        #[source]
        source: XrpcError,
    },

    #[error("PDS rejected credentials for {handle} (HTTP {status}): {message}")]
    Rejected {
        handle: String,
        status: StatusCode,
        message: String,
    },

    /// No response, or a 5xx from a PDS that is down.
    #[error("PDS unreachable: {0}")]
    Unreachable(#[source] XrpcError),

    #[error("malformed session response: {0}")]
    MalformedResponse(#[source] XrpcError),
}

impl AuthError {
    pub(crate) fn from_xrpc(handle: &str, error: XrpcError) -> Self {
        if error.is_server_error() {
            return Self::Unreachable(error);
        }
        match error {
            XrpcError::Status {
                status, message, ..
            } => Self::Rejected {
                handle: handle.to_owned(),
                status,
                message,
            },
            XrpcError::Decode { .. } => Self::MalformedResponse(error),
            other => Self::Unreachable(other),
        }
    }
}

/// Invite-code or account-creation failure.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid server address {server}: {source}")]
    InvalidServer {
        server: String,
        #[source]
        source: XrpcError,
    },

    #[error("issuing invite codes requires an admin token")]
    MissingAdminToken,

    #[error("{operation} rejected (HTTP {status}): {message}")]
    Rejected {
        operation: &'static str,
        status: StatusCode,
        message: String,
    },

    #[error("{operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: XrpcError,
    },

    #[error("{operation} returned a malformed response: {source}")]
    Malformed {
        operation: &'static str,
        #[source]
        source: XrpcError,
    },
}

impl ProvisionError {
    pub(crate) fn from_xrpc(operation: &'static str, error: XrpcError) -> Self {
        if error.is_server_error() {
            return Self::Transport {
                operation,
                source: error,
            };
        }
        match error {
            XrpcError::Status {
                status, message, ..
            } => Self::Rejected {
                operation,
                status,
                message,
            },
            XrpcError::Decode { .. } => Self::Malformed {
                operation,
                source: error,
            },
            other => Self::Transport {
                operation,
                source: other,
            },
        }
    }
}

/// Retrieval of an attachment's source bytes failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: StatusCode },
}

/// Submission of fetched bytes to the PDS failed.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("blob upload requires an active session")]
    Unauthenticated,

    #[error("blob upload failed: {0}")]
    Transport(#[source] XrpcError),
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// A facet anchor that does not occur in the post text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("annotation text {0:?} not found in post text")]
pub struct AnnotationNotFound(pub String);

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    AnnotationNotFound(#[from] AnnotationNotFound),

    #[error("{images} images supplied with {blobs} uploaded blobs")]
    ImageCountMismatch { images: usize, blobs: usize },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    Clock(#[source] time::error::Format),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("submitting a post requires an active session")]
    Unauthenticated,

    #[error("post submission failed: {0}")]
    Transport(#[source] XrpcError),
}

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("reading the timeline requires an active session")]
    Unauthenticated,

    #[error("timeline fetch failed: {0}")]
    Transport(#[source] XrpcError),
}
