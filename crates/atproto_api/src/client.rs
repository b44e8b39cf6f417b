use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::XrpcConfig;
use crate::error::{parse_error_body, XrpcError};
use crate::headers::{authorization_value, build_headers, XrpcAuth};
use crate::lexicon::{
    nsid, BlobRef, CreateAccountInput, CreateInviteCodeInput, CreateInviteCodeOutput,
    CreateRecordInput, CreateSessionInput, CreatedAccount, GetSessionOutput, RecordRef, Session,
    Timeline, UploadBlobOutput,
};
use crate::url::{domain_of, normalize_base_url, xrpc_endpoint};

const JSON_CONTENT_TYPE: &str = "application/json";

/// XRPC transport bound to one PDS host.
///
/// Holds at most one [`Session`]; session-authenticated calls read it, and
/// only the owner replaces it through [`XrpcClient::set_session`].
#[derive(Debug)]
pub struct XrpcClient {
    http: Client,
    config: XrpcConfig,
    session: Option<Session>,
}

impl XrpcClient {
    /// Fails with [`XrpcError::InvalidBaseUrl`] when no host can be read from
    /// `config.base_url`.
    pub fn new(config: XrpcConfig) -> Result<Self, XrpcError> {
        domain_of(&config.base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(XrpcError::from)?;
        Ok(Self {
            http,
            config,
            session: None,
        })
    }

    pub fn config(&self) -> &XrpcConfig {
        &self.config
    }

    /// Underlying HTTP client, shared with plain (non-XRPC) fetches.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn base_url(&self) -> String {
        normalize_base_url(&self.config.base_url)
    }

    pub fn endpoint(&self, method: &str) -> String {
        xrpc_endpoint(&self.config.base_url, method)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Replace the active session, returning the previous one.
    pub fn set_session(&mut self, session: Option<Session>) -> Option<Session> {
        std::mem::replace(&mut self.session, session)
    }

    pub fn set_admin_token(&mut self, admin_token: impl Into<String>) {
        self.config.admin_token = Some(admin_token.into());
    }

    pub fn build_headers(
        &self,
        auth: XrpcAuth,
        method: &'static str,
        content_type: Option<&str>,
    ) -> Result<HeaderMap, XrpcError> {
        let authorization = authorization_value(auth, &self.config, self.session.as_ref(), method)?;
        let headers = build_headers(&self.config, authorization.as_deref(), content_type);
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| XrpcError::InvalidHeader(format!("key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| XrpcError::InvalidHeader(format!("value for {key}")))?,
            );
        }
        Ok(out)
    }

    /// GET request for an XRPC query.
    pub fn build_query(
        &self,
        method: &'static str,
        auth: XrpcAuth,
        params: &[(&str, String)],
    ) -> Result<RequestBuilder, XrpcError> {
        let headers = self.build_headers(auth, method, None)?;
        Ok(self
            .http
            .get(self.endpoint(method))
            .headers(headers)
            .query(params))
    }

    /// POST request carrying a JSON input for an XRPC procedure.
    pub fn build_procedure<I>(
        &self,
        method: &'static str,
        auth: XrpcAuth,
        input: &I,
    ) -> Result<RequestBuilder, XrpcError>
    where
        I: Serialize + ?Sized,
    {
        let headers = self.build_headers(auth, method, Some(JSON_CONTENT_TYPE))?;
        Ok(self
            .http
            .post(self.endpoint(method))
            .headers(headers)
            .json(input))
    }

    /// POST request carrying raw bytes for an XRPC procedure.
    pub fn build_upload(
        &self,
        method: &'static str,
        auth: XrpcAuth,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<RequestBuilder, XrpcError> {
        let headers = self.build_headers(auth, method, Some(content_type))?;
        Ok(self
            .http
            .post(self.endpoint(method))
            .headers(headers)
            .body(bytes))
    }

    pub async fn query<O>(
        &self,
        method: &'static str,
        auth: XrpcAuth,
        params: &[(&str, String)],
    ) -> Result<O, XrpcError>
    where
        O: DeserializeOwned,
    {
        let request = self.build_query(method, auth, params)?;
        execute(method, request).await
    }

    pub async fn procedure<I, O>(
        &self,
        method: &'static str,
        auth: XrpcAuth,
        input: &I,
    ) -> Result<O, XrpcError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let request = self.build_procedure(method, auth, input)?;
        execute(method, request).await
    }

    pub async fn upload<O>(
        &self,
        method: &'static str,
        auth: XrpcAuth,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<O, XrpcError>
    where
        O: DeserializeOwned,
    {
        let request = self.build_upload(method, auth, bytes, content_type)?;
        execute(method, request).await
    }

    pub async fn create_session(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Session, XrpcError> {
        let input = CreateSessionInput {
            identifier: identifier.to_owned(),
            password: password.to_owned(),
        };
        self.procedure(nsid::CREATE_SESSION, XrpcAuth::Anonymous, &input)
            .await
    }

    pub async fn get_session(&self) -> Result<GetSessionOutput, XrpcError> {
        self.query(nsid::GET_SESSION, XrpcAuth::Session, &[]).await
    }

    pub async fn create_invite_code(&self, use_count: u32) -> Result<String, XrpcError> {
        let input = CreateInviteCodeInput {
            use_count,
            for_account: None,
        };
        let output: CreateInviteCodeOutput = self
            .procedure(nsid::CREATE_INVITE_CODE, XrpcAuth::Admin, &input)
            .await?;
        Ok(output.code)
    }

    pub async fn create_account(
        &self,
        input: &CreateAccountInput,
    ) -> Result<CreatedAccount, XrpcError> {
        self.procedure(nsid::CREATE_ACCOUNT, XrpcAuth::Anonymous, input)
            .await
    }

    pub async fn upload_blob(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobRef, XrpcError> {
        let output: UploadBlobOutput = self
            .upload(nsid::UPLOAD_BLOB, XrpcAuth::Session, bytes, content_type)
            .await?;
        Ok(output.blob)
    }

    /// Create a record in the session account's repo.
    pub async fn create_record<R>(
        &self,
        collection: &str,
        record: &R,
    ) -> Result<RecordRef, XrpcError>
    where
        R: Serialize,
    {
        let repo = self
            .session
            .as_ref()
            .map(|session| session.did.as_str())
            .filter(|did| !did.trim().is_empty())
            .ok_or(XrpcError::MissingSession {
                nsid: nsid::CREATE_RECORD,
            })?;
        let input = CreateRecordInput {
            repo,
            collection,
            record,
        };
        self.procedure(nsid::CREATE_RECORD, XrpcAuth::Session, &input)
            .await
    }

    pub async fn get_timeline(
        &self,
        algorithm: Option<&str>,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Timeline, XrpcError> {
        let mut params = vec![("limit", limit.to_string())];
        if let Some(algorithm) = algorithm.filter(|value| !value.is_empty()) {
            params.push(("algorithm", algorithm.to_owned()));
        }
        if let Some(cursor) = cursor.filter(|value| !value.is_empty()) {
            params.push(("cursor", cursor.to_owned()));
        }
        self.query(nsid::GET_TIMELINE, XrpcAuth::Session, &params)
            .await
    }
}

async fn execute<O>(method: &'static str, request: RequestBuilder) -> Result<O, XrpcError>
where
    O: DeserializeOwned,
{
    tracing::debug!(nsid = method, "sending XRPC request");
    let response = request.send().await.map_err(|error| {
        tracing::warn!(nsid = method, %error, "XRPC request failed");
        XrpcError::from(error)
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let (error, message) = parse_error_body(status, &body);
        tracing::warn!(
            nsid = method,
            status = status.as_u16(),
            error = error.as_deref().unwrap_or(""),
            "XRPC request rejected"
        );
        return Err(XrpcError::Status {
            nsid: method,
            status,
            error,
            message,
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| XrpcError::Decode {
        nsid: method,
        source,
    })
}
