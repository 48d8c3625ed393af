//! Connection settings shared by every request a `Client` makes.
//!
//! # Design
//! There is no process-wide mutable state. A caller builds one `ApiConfig`
//! (or reads it from the environment) and hands it to `Client::new`; the
//! default token lives here and a `Client` may override it.

use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.ax-semantics.com";
pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const ENV_API_BASE: &str = "AXSEMANTICS_API_BASE";
pub const ENV_API_VERSION: &str = "AXSEMANTICS_API_VERSION";
pub const ENV_API_TOKEN: &str = "AXSEMANTICS_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "AXSEMANTICS_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Scheme and host, without a trailing slash.
    pub api_base: String,
    pub api_version: String,
    /// Default token sent as `Authorization: Token <token>`.
    pub token: Option<String>,
    /// Per-request timeout. There are no retries.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ApiConfig {
    pub fn new(api_base: &str) -> Self {
        Self::default().with_api_base(api_base)
    }

    /// Defaults overridden by any `AXSEMANTICS_*` variables that are set.
    /// An unparsable timeout falls back to the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base) = env::var(ENV_API_BASE) {
            config = config.with_api_base(&base);
        }
        if let Ok(version) = env::var(ENV_API_VERSION) {
            config.api_version = version;
        }
        if let Ok(token) = env::var(ENV_API_TOKEN) {
            if !token.is_empty() {
                config.token = Some(token);
            }
        }
        if let Some(secs) = env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
