//! Client configuration loaded from environment variables.
//!
//! Every setting has a default, so a local backend on port 8080 works with
//! zero configuration.

use std::time::Duration;

use coursedesk_shared::constants::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, MAX_UPLOAD_SIZE};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST backend, without trailing slash.
    /// Env: `COURSEDESK_API_URL`
    /// Default: `http://localhost:8080`
    pub api_url: String,

    /// Per-request timeout.
    /// Env: `COURSEDESK_TIMEOUT_SECS`
    /// Default: `30`
    pub timeout: Duration,

    /// Largest attachment the composer accepts, in bytes.
    /// Env: `COURSEDESK_MAX_UPLOAD_BYTES`
    /// Default: 200 MiB
    pub max_upload_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_upload_bytes: MAX_UPLOAD_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("COURSEDESK_API_URL") {
            match normalize_url(&url) {
                Some(url) => config.api_url = url,
                None => tracing::warn!(value = %url, "Invalid COURSEDESK_API_URL, using default"),
            }
        }

        if let Some(val) = lookup("COURSEDESK_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid COURSEDESK_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = lookup("COURSEDESK_MAX_UPLOAD_BYTES") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_bytes = n,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid COURSEDESK_MAX_UPLOAD_BYTES, using default"
                ),
            }
        }

        // RUST_LOG is read by the EnvFilter in `init_tracing`.

        config
    }

    /// `path` joined onto the base URL. `path` starts with `/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

/// Accept only http(s) URLs; strip trailing slashes.
fn normalize_url(raw: &str) -> Option<String> {
    let url = raw.trim().trim_end_matches('/');
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))?;
    if rest.is_empty() {
        return None;
    }
    Some(url.to_string())
}
