use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_PDS_URL;

/// How to reach one PDS host.
#[derive(Debug, Clone)]
pub struct XrpcConfig {
    /// `/xrpc/<nsid>` is appended per call.
    pub base_url: String,
    /// Sent as HTTP Basic `admin:<token>` on admin calls only.
    pub admin_token: Option<String>,
    pub user_agent: Option<String>,
    /// Static headers sent on every call. An `authorization` entry is ignored.
    pub static_headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl Default for XrpcConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PDS_URL)
    }
}

impl XrpcConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            admin_token: None,
            user_agent: None,
            static_headers: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn with_admin_token(mut self, admin_token: impl Into<String>) -> Self {
        self.admin_token = Some(admin_token.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_static_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_headers.insert(name.into(), value.into());
        self
    }
}
