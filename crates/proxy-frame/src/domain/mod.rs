//! Domain types for the proxy frame protocol.
//!
//! Pure types and state machines; nothing here spawns tasks or touches a
//! channel. Tables, timers and the in-memory host live in `adapters`.

pub mod config;
pub mod correlation;
pub mod error;
pub mod handshake;
pub mod launch;
pub mod loader;
pub mod origin;
pub mod request;
pub mod response;

// Re-exports for convenience
pub use config::ProxyFrameConfig;
pub use correlation::{CorrelationId, FrameId};
pub use error::{
    ChannelError, ConfigError, ConnectError, DataDecodingError, ExecuteError, HostError,
    OriginError,
};
pub use handshake::{verify_handshake, HandshakeClaim, HandshakeVerdict, RejectReason};
pub use launch::LaunchParams;
pub use loader::{LoadFailure, Loader, LoaderPhase, LoaderState, Transition};
pub use origin::Origin;
pub use request::{HttpMethod, RequestBody, RequestSpec};
pub use response::{GuessedBody, ProxyResponse, ResponseStatus};
