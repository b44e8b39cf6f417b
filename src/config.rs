//! Environment configuration.

use std::env;
use std::time::Duration;

use atproto_api::{XrpcConfig, DEFAULT_PDS_URL};

pub const ENV_PDS_SERVER: &str = "SOCIALAT_PDS_SERVER";
pub const ENV_PDS_ADMIN_TOKEN: &str = "SOCIALAT_PDS_ADMIN_TOKEN";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "SOCIALAT_HTTP_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "SOCIALAT_USER_AGENT";

/// Overall bound applied to every remote call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// PDS base address.
    pub server: String,
    /// Administrative token for invite-code issuance.
    pub admin_token: Option<String>,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_PDS_URL.to_string(),
            admin_token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let timeout = env_string_opt(ENV_HTTP_TIMEOUT_SECS)
            .and_then(|value| match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    tracing::warn!(
                        key = ENV_HTTP_TIMEOUT_SECS,
                        value = %value,
                        "ignoring invalid timeout"
                    );
                    None
                }
            })
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            server: env_string_opt(ENV_PDS_SERVER).unwrap_or_else(|| DEFAULT_PDS_URL.to_string()),
            admin_token: env_string_opt(ENV_PDS_ADMIN_TOKEN),
            timeout,
            user_agent: env_string_opt(ENV_USER_AGENT),
        }
    }

    /// Defaults bound to `server`; blank falls back to the public PDS.
    pub fn for_server(server: impl Into<String>) -> Self {
        let server = server.into();
        if server.trim().is_empty() {
            return Self::default();
        }
        Self {
            server,
            ..Self::default()
        }
    }

    pub fn with_admin_token(mut self, admin_token: impl Into<String>) -> Self {
        self.admin_token = Some(admin_token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub(crate) fn xrpc_config(&self) -> XrpcConfig {
        let mut config = XrpcConfig::new(self.server.clone()).with_timeout(self.timeout);
        if let Some(admin_token) = &self.admin_token {
            config = config.with_admin_token(admin_token.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        config
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{
        AgentConfig, DEFAULT_TIMEOUT, ENV_HTTP_TIMEOUT_SECS, ENV_PDS_ADMIN_TOKEN, ENV_PDS_SERVER,
        ENV_USER_AGENT,
    };
    use std::env;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn env_defaults_point_at_public_pds() {
        let _lock = env_lock();
        let _g1 = set_env_guard(ENV_PDS_SERVER, None);
        let _g2 = set_env_guard(ENV_PDS_ADMIN_TOKEN, None);
        let _g3 = set_env_guard(ENV_HTTP_TIMEOUT_SECS, None);
        let _g4 = set_env_guard(ENV_USER_AGENT, None);

        let config = AgentConfig::from_env();
        assert_eq!(config.server, "https://bsky.social");
        assert!(config.admin_token.is_none());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn env_values_override_defaults() {
        let _lock = env_lock();
        let _g1 = set_env_guard(ENV_PDS_SERVER, Some("https://pds.example.org"));
        let _g2 = set_env_guard(ENV_PDS_ADMIN_TOKEN, Some("admin-secret"));
        let _g3 = set_env_guard(ENV_HTTP_TIMEOUT_SECS, Some("5"));
        let _g4 = set_env_guard(ENV_USER_AGENT, Some("socialat-test"));

        let config = AgentConfig::from_env();
        assert_eq!(config.server, "https://pds.example.org");
        assert_eq!(config.admin_token.as_deref(), Some("admin-secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent.as_deref(), Some("socialat-test"));

        let xrpc = config.xrpc_config();
        assert_eq!(xrpc.base_url, "https://pds.example.org");
        assert_eq!(xrpc.admin_token.as_deref(), Some("admin-secret"));
        assert_eq!(xrpc.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn blank_and_invalid_values_are_ignored() {
        let _lock = env_lock();
        let _g1 = set_env_guard(ENV_PDS_SERVER, Some("  "));
        let _g2 = set_env_guard(ENV_PDS_ADMIN_TOKEN, Some(""));
        let _g3 = set_env_guard(ENV_HTTP_TIMEOUT_SECS, Some("soon"));

        let config = AgentConfig::from_env();
        assert_eq!(config.server, "https://bsky.social");
        assert!(config.admin_token.is_none());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn for_server_keeps_blank_on_default_host() {
        assert_eq!(AgentConfig::for_server("").server, "https://bsky.social");
        assert_eq!(
            AgentConfig::for_server("https://pds.example.org").server,
            "https://pds.example.org"
        );
    }
}
