// Client configuration: credentials, bucket reference and the knobs that
// shape session reuse and upload retries.

use std::fmt;
use std::time::Duration;

use crate::error::{B2Error, B2Result};

/// Public entry point of the B2 native API.
pub const B2_BASE: &str = "https://api.backblazeb2.com/b2api/v2";

pub const B2_USER_AGENT_DEFAULT: &str = "django-backblazeb2-storage/v2";

/// B2 tokens live at most 24 hours; re-authorize well before that.
pub const AUTHORIZATION_BUFFER_DEFAULT: Duration = Duration::from_secs(60 * 60);

pub const MAX_UPLOAD_ATTEMPTS_DEFAULT: u32 = 3;

/// Configuration for [`crate::Client`].
#[derive(Clone)]
pub struct B2Config {
    pub key_id: String,
    pub application_key: String,
    pub bucket_id: String,
    /// Used to build public download URLs.
    pub bucket_name: String,
    /// Maximum session age before a call re-authorizes. `Duration::ZERO`
    /// re-authorizes on every call.
    pub reauthorization_buffer: Duration,
    pub user_agent: String,
    /// Base URL holding `b2_authorize_account`.
    pub auth_base_url: String,
    pub max_upload_attempts: u32,
    /// Per-request timeout; `None` keeps reqwest's default.
    pub timeout: Option<Duration>,
}

impl B2Config {
    pub fn new(
        key_id: impl Into<String>,
        application_key: impl Into<String>,
        bucket_id: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            application_key: application_key.into(),
            bucket_id: bucket_id.into(),
            bucket_name: bucket_name.into(),
            reauthorization_buffer: AUTHORIZATION_BUFFER_DEFAULT,
            user_agent: B2_USER_AGENT_DEFAULT.to_string(),
            auth_base_url: B2_BASE.to_string(),
            max_upload_attempts: MAX_UPLOAD_ATTEMPTS_DEFAULT,
            timeout: None,
        }
    }

    /// Build a config from `B2_*` environment variables. Key id, application
    /// key, bucket id and bucket name are required.
    pub fn from_env() -> B2Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> B2Result<Self> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| B2Error::config(format!("{} not set", name)))
        };

        let mut config = Self::new(
            required("B2_KEY_ID")?,
            required("B2_APPLICATION_KEY")?,
            required("B2_BUCKET_ID")?,
            required("B2_BUCKET_NAME")?,
        );

        if let Some(secs) = lookup("B2_REAUTHORIZATION_BUFFER_SECS") {
            config.reauthorization_buffer =
                Duration::from_secs(parse_number("B2_REAUTHORIZATION_BUFFER_SECS", &secs)?);
        }
        if let Some(agent) = lookup("B2_USER_AGENT") {
            config.user_agent = agent;
        }
        if let Some(base) = lookup("B2_AUTH_BASE_URL") {
            config = config.with_auth_base_url(base);
        }
        if let Some(attempts) = lookup("B2_MAX_UPLOAD_ATTEMPTS") {
            config.max_upload_attempts = parse_number("B2_MAX_UPLOAD_ATTEMPTS", &attempts)?;
        }
        if let Some(secs) = lookup("B2_TIMEOUT_SECS") {
            config.timeout = Some(Duration::from_secs(parse_number("B2_TIMEOUT_SECS", &secs)?));
        }

        Ok(config)
    }

    pub fn with_reauthorization_buffer(mut self, buffer: Duration) -> Self {
        self.reauthorization_buffer = buffer;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.auth_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_upload_attempts(mut self, attempts: u32) -> Self {
        self.max_upload_attempts = attempts;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> B2Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| B2Error::config(format!("{} is not a valid number: {}", name, raw)))
}

// Keep secrets out of logs.
impl fmt::Debug for B2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("B2Config")
            .field("key_id", &self.key_id)
            .field("application_key", &"<redacted>")
            .field("bucket_id", &self.bucket_id)
            .field("bucket_name", &self.bucket_name)
            .field("reauthorization_buffer", &self.reauthorization_buffer)
            .field("user_agent", &self.user_agent)
            .field("auth_base_url", &self.auth_base_url)
            .field("max_upload_attempts", &self.max_upload_attempts)
            .field("timeout", &self.timeout)
            .finish()
    }
}
