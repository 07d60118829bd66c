//! Console configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{CookieAttributes, SameSite, DEFAULT_MAX_AGE};

/// Page-wide settings shared by every unit
///
/// Deserializes from JSON with every field optional:
///
/// ```
/// use proxy_console_core::ConsoleConfig;
///
/// let config = ConsoleConfig::from_json(r#"{"cookie_prefix": "proxy-"}"#).unwrap();
/// assert_eq!(config.cookie_prefix, "proxy-");
/// assert_eq!(config.default_max_age, 360_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Prefix that marks proxy-control cookies
    pub cookie_prefix: String,
    /// Lifetime of cookies written by the console, in seconds
    pub default_max_age: u64,
    /// `path` attribute of cookie writes
    pub cookie_path: String,
    /// `samesite` attribute of cookie writes
    pub same_site: SameSite,
    /// Read-only statistics snapshot endpoint
    pub api_data_endpoint: String,
    /// Upper bound on every asset and data fetch, in milliseconds
    pub fetch_timeout_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            cookie_prefix: "mitm-".to_string(),
            default_max_age: DEFAULT_MAX_AGE,
            cookie_path: "/".to_string(),
            same_site: SameSite::Lax,
            api_data_endpoint: "/mitm-proxy/admin-ui.json".to_string(),
            fetch_timeout_ms: 10_000,
        }
    }
}

impl ConsoleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cookie_prefix = prefix.into();
        self
    }

    pub fn with_api_data_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_data_endpoint = endpoint.into();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Write attributes for the cookie store
    pub fn cookie_attributes(&self) -> CookieAttributes {
        CookieAttributes {
            path: self.cookie_path.clone(),
            same_site: self.same_site,
            default_max_age: self.default_max_age,
        }
    }
}
