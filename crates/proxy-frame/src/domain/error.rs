//! Error types for frame establishment and request execution.
//!
//! Two separate families:
//! - [`ConnectError`]: the frame could not be established. Plain reasons.
//! - [`ExecuteError`]: a request failed. [`ExecuteError::Remote`] carries the
//!   full response for application-level (non-"ok") failures.

use crate::domain::response::ProxyResponse;
use std::time::Duration;

/// URL/origin parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OriginError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("url has an opaque origin: {0}")]
    Opaque(String),
}

impl From<url::ParseError> for OriginError {
    fn from(e: url::ParseError) -> Self {
        OriginError::InvalidUrl(e.to_string())
    }
}

/// Failure to post on a frame channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,

    #[error("post failed: {0}")]
    PostFailed(String),
}

/// Failure of the host environment to create an embedded context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("frame container unavailable")]
    ContainerUnavailable,

    #[error("mount failed: {0}")]
    MountFailed(String),
}

/// Transport-establishment failure, fatal to one `create` call.
///
/// `Clone` because concurrent `create` calls for one origin share a single
/// connection attempt and each receives the outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// The embedded context never signalled load completion
    #[error("frame load timed out")]
    LoadTimedOut,

    /// The context loaded but no valid handshake arrived
    #[error("loaded frame is invalid")]
    InvalidFrame,

    #[error(transparent)]
    InvalidOrigin(#[from] OriginError),

    #[error(transparent)]
    Host(#[from] HostError),

    /// The handshake acknowledgement could not be delivered
    #[error("handshake acknowledgement failed: {0}")]
    Channel(#[from] ChannelError),

    #[error("envelope encoding failed: {0}")]
    Encode(String),

    /// The loader was dropped without settling
    #[error("connection attempt abandoned")]
    Abandoned,
}

/// Failure of a single `execute` call
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// The remote frame answered with a non-"ok" status
    #[error("remote request failed: {0}")]
    Remote(Box<ProxyResponse>),

    /// No response arrived before the request deadline
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("request could not be sent: {0}")]
    Send(#[from] ChannelError),

    #[error("envelope encoding failed: {0}")]
    Encode(String),

    #[error("too many pending requests (limit {limit})")]
    TooManyPending { limit: usize },

    /// The pending entry was removed without a response
    #[error("request cancelled")]
    Cancelled,
}

impl ExecuteError {
    /// The response carried by an application-level failure.
    pub fn response(&self) -> Option<&ProxyResponse> {
        match self {
            ExecuteError::Remote(response) => Some(response),
            _ => None,
        }
    }

    /// True for application-level failures (a response exists).
    pub fn is_remote(&self) -> bool {
        matches!(self, ExecuteError::Remote(_))
    }
}

/// Structured decoding of a response body failed
#[derive(Debug, thiserror::Error)]
#[error("unable to parse response data: {source}")]
pub struct DataDecodingError {
    #[from]
    source: serde_json::Error,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid url for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("invalid parent origin: {0}")]
    InvalidOrigin(#[from] OriginError),

    #[error("config parse error: {0}")]
    Parse(String),
}
