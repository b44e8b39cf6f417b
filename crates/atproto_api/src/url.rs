use url::Url;

use crate::error::XrpcError;

/// Public PDS used when no server address is configured.
pub const DEFAULT_PDS_URL: &str = "https://bsky.social";

/// Normalize a PDS base URL.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_PDS_URL`]
/// 2) surrounding whitespace and trailing `/` are dropped
/// 3) a trailing `/xrpc` segment is removed so callers may pass either form
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_PDS_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/xrpc").unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_string()
}

/// Full endpoint URL for an XRPC method.
pub fn xrpc_endpoint(base_url: &str, nsid: &str) -> String {
    format!("{}/xrpc/{nsid}", normalize_base_url(base_url))
}

/// Host component of a server address, e.g. `pds.example.org` for
/// `https://pds.example.org:2583/`. Scheme-less input is read as `https`.
pub fn domain_of(server: &str) -> Result<String, XrpcError> {
    let normalized = normalize_base_url(server);
    let candidate = if normalized.contains("://") {
        normalized
    } else {
        format!("https://{normalized}")
    };

    let parsed =
        Url::parse(&candidate).map_err(|error| XrpcError::InvalidBaseUrl(format!("{server}: {error}")))?;
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| XrpcError::InvalidBaseUrl(format!("{server}: missing host")))
}
