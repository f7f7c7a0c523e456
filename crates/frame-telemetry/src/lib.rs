//! # Frame Telemetry
//!
//! Logging setup for hosts embedding `proxy-frame`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use frame_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // proxy-frame now logs through the global subscriber
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | unset | Full filter directive, takes precedence |
//! | `PF_LOG_LEVEL` | `info` | Log level filter |
//! | `PF_SERVICE_NAME` | `proxy-frame` | Service name attached to the startup log |
//! | `PF_JSON_LOGS` | `false` | JSON formatted logs |
//! | `PF_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber was installed before
    #[error("failed to install subscriber: {0}")]
    SubscriberInit(String),
}
