//! Proxy frame configuration with validation.
//!
//! Durations are expressed in milliseconds in serialized form:
//!
//! ```toml
//! load_timeout = 3000
//! handshake_timeout = 3000
//! request_timeout = 30000
//! scripts_base = "https://app.example.com/scripts/bin"
//! parent_origin = "https://app.example.com"
//! max_pending_requests = 1024
//! ```
//!
//! `request_timeout = 0` disables the request deadline.

use crate::domain::error::ConfigError;
use crate::domain::origin::Origin;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;
use url::Url;

/// Default wait for the embedded context to load
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(3000);

/// Default wait for the handshake after load
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Default deadline for a single proxied request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyFrameConfig {
    /// Wait for the embedded context's load signal
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub load_timeout: Duration,
    /// Wait for the handshake once the context has loaded
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub handshake_timeout: Duration,
    /// Per-request deadline (None = wait indefinitely; 0 in TOML).
    /// `no_default` so an absent key keeps the container default.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>", no_default)]
    pub request_timeout: Option<Duration>,
    /// Script location passed to remote frames
    pub scripts_base: String,
    /// Origin remote frames post back to
    pub parent_origin: String,
    /// Upper bound on concurrently pending requests
    pub max_pending_requests: usize,
}

impl Default for ProxyFrameConfig {
    fn default() -> Self {
        Self {
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            scripts_base: "http://localhost/scripts/bin".to_string(),
            parent_origin: "http://localhost".to_string(),
            max_pending_requests: 1024,
        }
    }
}

impl ProxyFrameConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        // TOML has no null
        if config.request_timeout.is_some_and(|t| t.is_zero()) {
            config.request_timeout = None;
        }
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.load_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "load_timeout cannot be 0".into(),
            ));
        }

        if self.handshake_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "handshake_timeout cannot be 0".into(),
            ));
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout cannot be 0 (use None to disable)".into(),
            ));
        }

        if self.max_pending_requests == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_pending_requests cannot be 0".into(),
            ));
        }

        self.scripts_base_url()?;
        self.parent_origin()?;

        Ok(())
    }

    pub fn scripts_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.scripts_base).map_err(|e| ConfigError::InvalidUrl {
            field: "scripts_base",
            reason: e.to_string(),
        })
    }

    pub fn parent_origin(&self) -> Result<Origin, ConfigError> {
        Ok(Origin::parse(&self.parent_origin)?)
    }

    /// Config pointing at example origins, for tests
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        Self {
            load_timeout: Duration::from_millis(3000),
            handshake_timeout: Duration::from_millis(3000),
            request_timeout: Some(Duration::from_secs(5)),
            scripts_base: "https://app.example.com/scripts/bin".to_string(),
            parent_origin: "https://app.example.com".to_string(),
            max_pending_requests: 16,
        }
    }
}
