//! Session-owning PDS agent.
//!
//! An [`Agent`] holds one transport, the long-lived credentials used to log in
//! and at most one [`Session`]. The session is replaced only after a fully
//! decoded login response, so a failed call never leaves partial state.
//! Nothing here retries; every failure goes straight back to the caller.

use std::fmt;

use atproto_api::lexicon::CreateAccountInput;
use atproto_api::{
    BlobRef, CreatedAccount, PostRecord, RecordRef, Session, Timeline, XrpcClient, XrpcError,
    POST_COLLECTION,
};

use crate::blob::BlobUploader;
use crate::config::AgentConfig;
use crate::error::{AuthError, BlobError, ProvisionError, SubmitError, TimelineError};
use crate::handle::handle_from_username;
use crate::post::Image;

pub const DEFAULT_TIMELINE_LIMIT: u32 = 50;
pub const MAX_TIMELINE_LIMIT: u32 = 100;
pub const TIMELINE_ALGORITHM: &str = "reverse-chronological";

const OP_INVITE_CODE: &str = "createInviteCode";
const OP_CREATE_ACCOUNT: &str = "createAccount";

/// Outcome of probing a session against the PDS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Valid,
    /// The PDS no longer accepts the session; log in again.
    Stale,
}

pub struct Agent {
    transport: XrpcClient,
    handle: String,
    password: String,
    email: Option<String>,
    invite_code: Option<String>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("server", &self.transport.base_url())
            .field("handle", &self.handle)
            .field("session", &self.transport.session())
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new(
        config: &AgentConfig,
        handle: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, XrpcError> {
        Ok(Self {
            transport: XrpcClient::new(config.xrpc_config())?,
            handle: handle.into(),
            password: password.into(),
            email: None,
            invite_code: None,
        })
    }

    /// Agent without login credentials, for provisioning or adopted sessions.
    pub fn basic(config: &AgentConfig) -> Result<Self, XrpcError> {
        Self::new(config, "", "")
    }

    pub fn server(&self) -> String {
        self.transport.base_url()
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn session(&self) -> Option<&Session> {
        self.transport.session()
    }

    pub fn transport(&self) -> &XrpcClient {
        &self.transport
    }

    /// Adopt a session obtained elsewhere (e.g. restored by the caller).
    pub fn set_session(&mut self, session: Session) {
        self.transport.set_session(Some(session));
    }

    pub fn clear_session(&mut self) -> Option<Session> {
        self.transport.set_session(None)
    }

    pub fn set_admin_token(&mut self, admin_token: impl Into<String>) {
        self.transport.set_admin_token(admin_token);
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = Some(email.into());
    }

    pub fn set_invite_code(&mut self, invite_code: impl Into<String>) {
        self.invite_code = Some(invite_code.into());
    }

    /// Log in with the stored handle and password.
    pub async fn connect(&mut self) -> Result<Session, AuthError> {
        let session = self
            .transport
            .create_session(&self.handle, &self.password)
            .await
            .map_err(|error| {
                tracing::warn!(handle = %self.handle, %error, "PDS login failed");
                AuthError::from_xrpc(&self.handle, error)
            })?;

        tracing::info!(handle = %session.handle, did = %session.did, "PDS session established");
        self.transport.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Probe the active session without changing it.
    ///
    /// A 4xx rejection by the PDS, or a session answering for another account,
    /// is [`SessionStatus::Stale`]. Transport failures and 5xx responses are
    /// [`AuthError::Unreachable`].
    pub async fn validate(&self) -> Result<SessionStatus, AuthError> {
        let Some(session) = self.transport.session() else {
            return Ok(SessionStatus::Stale);
        };

        match self.transport.get_session().await {
            Ok(current) if current.did == session.did => Ok(SessionStatus::Valid),
            Ok(current) => {
                tracing::warn!(expected = %session.did, actual = %current.did, "session DID mismatch");
                Ok(SessionStatus::Stale)
            }
            Err(XrpcError::Status { status, .. }) if status.is_client_error() => {
                tracing::debug!(did = %session.did, status = status.as_u16(), "session is stale");
                Ok(SessionStatus::Stale)
            }
            Err(XrpcError::MissingSession { .. }) => Ok(SessionStatus::Stale),
            Err(error) => Err(AuthError::from_xrpc(&session.handle, error)),
        }
    }

    /// Log in again with the stored password. The refresh token is not used.
    pub async fn reconnect(&mut self) -> Result<Session, AuthError> {
        self.connect().await
    }

    /// Keep a valid session, or log in again when it has gone stale.
    pub async fn ensure_session(&mut self) -> Result<Session, AuthError> {
        if self.validate().await? == SessionStatus::Valid {
            if let Some(session) = self.transport.session() {
                return Ok(session.clone());
            }
        }
        self.reconnect().await
    }

    /// Issue a single-use invite code with the configured admin token.
    pub async fn issue_invite_code(&self) -> Result<String, ProvisionError> {
        let has_token = self
            .transport
            .config()
            .admin_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty());
        if !has_token {
            return Err(ProvisionError::MissingAdminToken);
        }

        let code = self
            .transport
            .create_invite_code(1)
            .await
            .map_err(|error| {
                tracing::warn!(%error, "invite code issuance failed");
                ProvisionError::from_xrpc(OP_INVITE_CODE, error)
            })?;
        tracing::info!("issued single-use invite code");
        Ok(code)
    }

    /// Create `username.<server host>` with the stored email and invite code.
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
    ) -> Result<CreatedAccount, ProvisionError> {
        let server = self.transport.config().base_url.clone();
        let handle = handle_from_username(&server, username)
            .map_err(|source| ProvisionError::InvalidServer { server, source })?;

        let input = CreateAccountInput {
            handle,
            email: self.email.clone(),
            password: Some(password.to_owned()),
            invite_code: self.invite_code.clone(),
        };
        let account = self
            .transport
            .create_account(&input)
            .await
            .map_err(|error| {
                tracing::warn!(handle = %input.handle, %error, "account creation failed");
                ProvisionError::from_xrpc(OP_CREATE_ACCOUNT, error)
            })?;
        tracing::info!(handle = %account.handle, did = %account.did, "PDS account created");
        Ok(account)
    }

    pub fn uploader(&self) -> BlobUploader<'_> {
        BlobUploader::new(&self.transport)
    }

    pub async fn upload_image(&self, image: &Image) -> Result<BlobRef, BlobError> {
        self.uploader().upload(image).await
    }

    /// Upload images; the result lines up with `images` by position.
    pub async fn upload_images(&self, images: &[Image]) -> Result<Vec<BlobRef>, BlobError> {
        self.uploader().upload_many(images).await
    }

    /// Create the post in the session account's repo.
    pub async fn submit(&self, record: &PostRecord) -> Result<RecordRef, SubmitError> {
        if !self.transport.session().is_some_and(Session::is_usable) {
            return Err(SubmitError::Unauthenticated);
        }

        let created = self
            .transport
            .create_record(POST_COLLECTION, record)
            .await
            .map_err(|error| match error {
                XrpcError::MissingSession { .. } => SubmitError::Unauthenticated,
                other => {
                    tracing::warn!(error = %other, "post submission failed");
                    SubmitError::Transport(other)
                }
            })?;
        tracing::info!(uri = %created.uri, cid = %created.cid, "post created");
        Ok(created)
    }

    /// Reverse-chronological home timeline. `limit` defaults to
    /// [`DEFAULT_TIMELINE_LIMIT`] and is clamped to `1..=MAX_TIMELINE_LIMIT`.
    pub async fn get_timeline(
        &self,
        cursor: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Timeline, TimelineError> {
        if !self.transport.session().is_some_and(Session::is_usable) {
            return Err(TimelineError::Unauthenticated);
        }

        let limit = limit
            .unwrap_or(DEFAULT_TIMELINE_LIMIT)
            .clamp(1, MAX_TIMELINE_LIMIT);
        self.transport
            .get_timeline(Some(TIMELINE_ALGORITHM), cursor, limit)
            .await
            .map_err(|error| match error {
                XrpcError::MissingSession { .. } => TimelineError::Unauthenticated,
                other => TimelineError::Transport(other),
            })
    }
}

fn agent_for(server: &str, handle: &str, password: &str) -> Result<Agent, AuthError> {
    Agent::new(&AgentConfig::for_server(server), handle, password).map_err(|source| {
        AuthError::InvalidServer {
            server: server.to_owned(),
            source,
        }
    })
}

/// Log in to `server` and return the new session.
pub async fn connect(server: &str, handle: &str, password: &str) -> Result<Session, AuthError> {
    let mut agent = agent_for(server, handle, password)?;
    agent.connect().await
}

/// Check whether `session` is still accepted by `server`.
pub async fn validate(server: &str, session: &Session) -> Result<SessionStatus, AuthError> {
    let mut agent = agent_for(server, &session.handle, "")?;
    agent.set_session(session.clone());
    agent.validate().await
}

/// Obtain a fresh session after [`validate`] reported [`SessionStatus::Stale`].
///
/// This is a full login with the stored password, not a token refresh.
pub async fn reconnect_if_stale(
    server: &str,
    handle: &str,
    password: &str,
) -> Result<Session, AuthError> {
    connect(server, handle, password).await
}

/// Return `session` when it is still valid, otherwise log in again.
pub async fn ensure_session(
    server: &str,
    session: &Session,
    handle: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let mut agent = agent_for(server, handle, password)?;
    agent.set_session(session.clone());
    agent.ensure_session().await
}

/// Issue a single-use invite code with `admin_token`.
pub async fn issue_invite_code(server: &str, admin_token: &str) -> Result<String, ProvisionError> {
    let config = AgentConfig::for_server(server).with_admin_token(admin_token);
    let agent = Agent::basic(&config).map_err(|source| ProvisionError::InvalidServer {
        server: server.to_owned(),
        source,
    })?;
    agent.issue_invite_code().await
}

/// Create an account whose handle is derived from `username` and `server`.
pub async fn create_account(
    server: &str,
    username: &str,
    password: &str,
    email: &str,
    invite_code: &str,
) -> Result<CreatedAccount, ProvisionError> {
    let mut agent = Agent::basic(&AgentConfig::for_server(server)).map_err(|source| {
        ProvisionError::InvalidServer {
            server: server.to_owned(),
            source,
        }
    })?;
    agent.set_email(email);
    agent.set_invite_code(invite_code);
    agent.create_account(username, password).await
}

#[cfg(test)]
mod tests {
    use super::{Agent, SessionStatus};
    use crate::config::AgentConfig;
    use crate::error::{ProvisionError, SubmitError, TimelineError};
    use crate::post::PostBuilder;
    use atproto_api::Session;

    fn agent() -> Agent {
        Agent::new(
            &AgentConfig::for_server("http://127.0.0.1:9"),
            "alice.test",
            "hunter2",
        )
        .expect("agent")
    }

    #[test]
    fn debug_output_hides_password_and_tokens() {
        let mut agent = agent();
        agent.set_session(Session::new("access-secret", "refresh-secret", "alice.test", "did:plc:a"));
        let debug = format!("{agent:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("access-secret"));
        assert!(debug.contains("alice.test"));
    }

    #[tokio::test]
    async fn submit_without_session_is_unauthenticated() {
        let record = PostBuilder::new("hi").build().expect("record");
        let error = agent().submit(&record).await.expect_err("no session");
        assert!(matches!(error, SubmitError::Unauthenticated));
    }

    #[tokio::test]
    async fn submit_with_blank_did_is_unauthenticated() {
        let mut agent = agent();
        agent.set_session(Session::new("access", "refresh", "alice.test", " "));
        let record = PostBuilder::new("hi").build().expect("record");
        let error = agent.submit(&record).await.expect_err("blank did");
        assert!(matches!(error, SubmitError::Unauthenticated));
    }

    #[tokio::test]
    async fn timeline_without_session_is_unauthenticated() {
        let error = agent().get_timeline(None, None).await.expect_err("no session");
        assert!(matches!(error, TimelineError::Unauthenticated));
    }

    #[tokio::test]
    async fn validate_without_session_is_stale() {
        assert_eq!(agent().validate().await.expect("status"), SessionStatus::Stale);
    }

    #[tokio::test]
    async fn invite_code_requires_admin_token() {
        let error = agent().issue_invite_code().await.expect_err("no admin token");
        assert!(matches!(error, ProvisionError::MissingAdminToken));
    }
}
