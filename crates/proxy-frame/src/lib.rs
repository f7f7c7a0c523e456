//! Proxy Frame - cross-origin request proxying through handshaked remote frames.
//!
//! A host that cannot reach a remote origin directly embeds a small script
//! served by that origin and asks it to perform requests on its behalf.
//! This crate owns the host side of that protocol: loading the embedded
//! context, verifying its handshake, and correlating requests with responses.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      ProxyFrameService                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   create(url) ──▶ Frame Registry ──hit──▶ Arc<ProxyFrame>       │
//! │                        │ miss                                   │
//! │                        ▼                                        │
//! │                  Loader Table  ──mount──▶ FrameHost             │
//! │           (load / handshake timers)                             │
//! │                        ▲                                        │
//! │  handle_message ──▶ Message Router ──▶ Pending Request Table    │
//! │  frame_loaded ─────────┘                  ▲                     │
//! │                                           │                     │
//! │   ProxyFrame::execute ──register──────────┘ ──post──▶ Channel   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use proxy_frame::{ProxyFrameConfig, ProxyFrameService, RequestSpec};
//!
//! let service = ProxyFrameService::new(ProxyFrameConfig::default(), host)?;
//! let frame = service.create(&"https://api.example.com/proxy.html".parse()?).await?;
//! let response = frame.execute(RequestSpec::get(url), None).await?;
//! ```
//!
//! # Security
//!
//! - Handshakes are accepted only when the declared origin, the observed
//!   sender origin and the launch origin all agree, and the frame id matches
//! - Responses are accepted only from the origin the request was sent to
//! - Outbound messages are always posted with an explicit target origin

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod frame;
pub mod ipc;
pub mod ports;
pub mod service;

// Re-exports
pub use domain::{
    ChannelError, ConfigError, ConnectError, CorrelationId, DataDecodingError, ExecuteError,
    FrameId, GuessedBody, HostError, HttpMethod, LaunchParams, Origin, OriginError,
    ProxyFrameConfig, ProxyResponse, RequestBody, RequestSpec, ResponseStatus,
};
pub use frame::{ProxyFrame, ResponseHandle};
pub use ipc::{EnvelopeError, RouteOutcome};
pub use ports::{FrameChannel, FrameHost};
pub use service::ProxyFrameService;

#[cfg(any(test, feature = "test-utils"))]
pub use adapters::memory::{handshake_wire, response_wire, MemoryChannel, MemoryFrameHost};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
