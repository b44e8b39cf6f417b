use atproto_api::{domain_of, XrpcError};

/// Derive the protocol handle for `username` on `server`: `username.<server host>`.
pub fn handle_from_username(server: &str, username: &str) -> Result<String, XrpcError> {
    let domain = domain_of(server)?;
    Ok(format!("{}.{domain}", username.trim()))
}
