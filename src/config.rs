//! Client configuration: backend base URL and request timeout.

/// Default per-request timeout in seconds.  The historical client applied
/// none beyond the platform default; an explicit ceiling keeps a dead
/// backend from pinning the UI forever.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable naming the backend base URL.
const API_URL_VAR: &str = "ROAMLY_API_URL";

/// Connection settings for [`crate::api::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (e.g. `https://api.roamly.app`), no trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Create a config with the default timeout.  Trailing slashes on the
    /// base URL are trimmed so path joining stays uniform.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load from environment variables.  Returns `None` when the URL is
    /// unset or empty.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(API_URL_VAR).ok()?;
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self::new(url))
    }

    /// Override the request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let config = ClientConfig::new("https://api.roamly.app///");
        assert_eq!(config.base_url, "https://api.roamly.app");
    }

    #[test]
    fn timeout_defaults_and_overrides() {
        let config = ClientConfig::new("http://localhost:5055");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.with_timeout_secs(5).timeout_secs, 5);
    }
}
