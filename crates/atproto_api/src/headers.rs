use std::collections::BTreeMap;

use base64::{engine::general_purpose, Engine as _};

use crate::config::XrpcConfig;
use crate::error::XrpcError;
use crate::lexicon::{nsid, Session};

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Credential family a call is made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrpcAuth {
    /// No `Authorization` header (session creation, account creation).
    Anonymous,
    /// `Bearer <accessJwt>` from the active session.
    Session,
    /// HTTP Basic `admin:<token>` from [`XrpcConfig::admin_token`].
    Admin,
}

/// Whether an NSID is reserved for administrative credentials.
pub fn is_admin_method(method: &str) -> bool {
    method.starts_with(nsid::ADMIN_PREFIX)
        || method == nsid::CREATE_INVITE_CODE
        || method == nsid::CREATE_INVITE_CODES
}

/// Resolve the `Authorization` value for one call.
///
/// Admin credentials never leave the client for non-admin methods, and a
/// session-authenticated call without a session fails before any I/O.
pub fn authorization_value(
    auth: XrpcAuth,
    config: &XrpcConfig,
    session: Option<&Session>,
    method: &'static str,
) -> Result<Option<String>, XrpcError> {
    match auth {
        XrpcAuth::Anonymous => Ok(None),
        XrpcAuth::Session => {
            let token = session
                .map(|session| session.access_jwt.trim())
                .filter(|token| !token.is_empty())
                .ok_or(XrpcError::MissingSession { nsid: method })?;
            Ok(Some(format!("Bearer {token}")))
        }
        XrpcAuth::Admin => {
            if !is_admin_method(method) {
                return Err(XrpcError::InvalidHeader(format!(
                    "admin credentials are not accepted by {method}"
                )));
            }
            let token = config
                .admin_token
                .as_deref()
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .ok_or_else(|| XrpcError::InvalidHeader("admin token is required".to_owned()))?;
            let encoded = general_purpose::STANDARD.encode(format!("admin:{token}"));
            Ok(Some(format!("Basic {encoded}")))
        }
    }
}

/// Build a deterministic header map for an XRPC request.
pub fn build_headers(
    config: &XrpcConfig,
    authorization: Option<&str>,
    content_type: Option<&str>,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());
    if let Some(content_type) = content_type.map(str::trim).filter(|value| !value.is_empty()) {
        headers.insert(HEADER_CONTENT_TYPE.to_owned(), content_type.to_owned());
    }
    if let Some(authorization) = authorization {
        headers.insert(HEADER_AUTHORIZATION.to_owned(), authorization.to_owned());
    }

    let ua = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.static_headers {
        let key = key.trim().to_ascii_lowercase();
        // Credentials are chosen per call, never through static headers.
        if key == HEADER_AUTHORIZATION {
            continue;
        }
        headers.insert(key, value.trim().to_owned());
    }

    headers
}

fn default_user_agent() -> String {
    format!("socialat-atproto/{}", env!("CARGO_PKG_VERSION"))
}
