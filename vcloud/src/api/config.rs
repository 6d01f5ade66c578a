//! Client configuration, with environment variable fallbacks

use std::time::Duration;

use super::common::DEFAULT_API_VERSION;
use super::error::ApiError;
use super::pool::ConnectionPoolConfig;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    /// Legacy `x-vcloud-authorization` session token
    #[default]
    Token,
    /// `Authorization: Bearer` access token
    Bearer,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://vcd.example.com/api`
    pub endpoint: String,
    pub org: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub auth_type: AuthType,
    pub insecure: bool,
    pub api_version: String,
    pub retry: RetryConfig,
    pub pool: ConnectionPoolConfig,
    pub task_poll_interval: Duration,
    /// `None` waits for tasks indefinitely.
    pub task_timeout: Option<Duration>,
    pub busy_retry_interval: Duration,
    pub max_retry_timeout: Duration,
    /// How often `UploadTask::show_progress` reports
    pub upload_progress_interval: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            org: None,
            user: None,
            password: None,
            token: None,
            auth_type: AuthType::default(),
            insecure: false,
            api_version: DEFAULT_API_VERSION.to_string(),
            retry: RetryConfig::default(),
            pool: ConnectionPoolConfig::default(),
            task_poll_interval: Duration::from_secs(3),
            task_timeout: None,
            busy_retry_interval: Duration::from_secs(3),
            max_retry_timeout: Duration::from_secs(60),
            upload_progress_interval: Duration::from_secs(1),
        }
    }

    /// Reads `VCD_URL`, `VCD_ORG`, `VCD_USER`, `VCD_PASSWORD`, `VCD_TOKEN`,
    /// `VCD_AUTH_TYPE`, `VCD_ALLOW_UNVERIFIED_SSL`, `VCD_API_VERSION` and
    /// `VCD_MAX_RETRY_TIMEOUT`.
    pub fn from_env() -> Result<Self, ApiError> {
        let endpoint = std::env::var("VCD_URL").map_err(|_| {
            ApiError::InvalidRequest("VCD_URL environment variable is not set".to_string())
        })?;

        let mut config = Self::new(endpoint);
        config.org = env_non_empty("VCD_ORG");
        config.user = env_non_empty("VCD_USER");
        config.password = env_non_empty("VCD_PASSWORD");
        config.token = env_non_empty("VCD_TOKEN");

        if let Some(auth_type) = env_non_empty("VCD_AUTH_TYPE") {
            config.auth_type = match auth_type.to_lowercase().as_str() {
                "token" => AuthType::Token,
                "bearer" => AuthType::Bearer,
                other => {
                    return Err(ApiError::InvalidRequest(format!(
                        "VCD_AUTH_TYPE must be 'token' or 'bearer', got '{}'",
                        other
                    )))
                }
            };
        }

        config.insecure = env_non_empty("VCD_ALLOW_UNVERIFIED_SSL")
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        if let Some(version) = env_non_empty("VCD_API_VERSION") {
            config.api_version = version;
        }

        if let Some(seconds) = env_non_empty("VCD_MAX_RETRY_TIMEOUT") {
            let seconds = seconds.parse::<u64>().map_err(|_| {
                ApiError::InvalidRequest(format!(
                    "VCD_MAX_RETRY_TIMEOUT must be a number of seconds, got '{}'",
                    seconds
                ))
            })?;
            config.max_retry_timeout = Duration::from_secs(seconds);
        }

        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>, auth_type: AuthType) -> Self {
        self.token = Some(token.into());
        self.auth_type = auth_type;
        self
    }

    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
        org: impl Into<String>,
    ) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self.org = Some(org.into());
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_task_poll_interval(mut self, interval: Duration) -> Self {
        self.task_poll_interval = interval;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn with_busy_retry_interval(mut self, interval: Duration) -> Self {
        self.busy_retry_interval = interval;
        self
    }

    pub fn with_upload_progress_interval(mut self, interval: Duration) -> Self {
        self.upload_progress_interval = interval;
        self
    }

    pub fn with_max_retry_timeout(mut self, timeout: Duration) -> Self {
        self.max_retry_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.pool.request_timeout = Duration::from_secs(retry.timeout_seconds);
        self.retry = retry;
        self
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "VCD_URL",
        "VCD_ORG",
        "VCD_USER",
        "VCD_PASSWORD",
        "VCD_TOKEN",
        "VCD_AUTH_TYPE",
        "VCD_ALLOW_UNVERIFIED_SSL",
        "VCD_API_VERSION",
        "VCD_MAX_RETRY_TIMEOUT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::new("https://vcd.example.com/api");
        assert_eq!(config.api_version, "32.0");
        assert_eq!(config.task_poll_interval, Duration::from_secs(3));
        assert!(config.task_timeout.is_none());
        assert_eq!(config.max_retry_timeout, Duration::from_secs(60));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.auth_type, AuthType::Token);
    }

    #[test]
    #[serial]
    fn from_env_reads_all_variables() {
        clear_env();
        std::env::set_var("VCD_URL", "https://vcd.example.com/api");
        std::env::set_var("VCD_ORG", "acme");
        std::env::set_var("VCD_USER", "admin");
        std::env::set_var("VCD_PASSWORD", "secret");
        std::env::set_var("VCD_AUTH_TYPE", "bearer");
        std::env::set_var("VCD_TOKEN", "abc");
        std::env::set_var("VCD_ALLOW_UNVERIFIED_SSL", "true");
        std::env::set_var("VCD_API_VERSION", "33.0");
        std::env::set_var("VCD_MAX_RETRY_TIMEOUT", "120");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.endpoint, "https://vcd.example.com/api");
        assert_eq!(config.org.as_deref(), Some("acme"));
        assert_eq!(config.user.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.auth_type, AuthType::Bearer);
        assert!(config.insecure);
        assert_eq!(config.api_version, "33.0");
        assert_eq!(config.max_retry_timeout, Duration::from_secs(120));

        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_requires_url() {
        clear_env();
        let err = ClientConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("VCD_URL"));
    }

    #[test]
    #[serial]
    fn from_env_rejects_bad_values() {
        clear_env();
        std::env::set_var("VCD_URL", "https://vcd.example.com/api");
        std::env::set_var("VCD_AUTH_TYPE", "kerberos");
        assert!(ClientConfig::from_env().is_err());

        std::env::set_var("VCD_AUTH_TYPE", "token");
        std::env::set_var("VCD_MAX_RETRY_TIMEOUT", "soon");
        assert!(ClientConfig::from_env().is_err());

        clear_env();
    }
}
