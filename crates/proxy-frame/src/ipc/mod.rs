//! Wire protocol: message payloads, the envelope codec and the inbound router.

pub mod envelope;
pub mod messages;
pub mod router;

pub use envelope::{Envelope, EnvelopeError};
pub use messages::{
    ExecuteCommandRequest, ExecuteCommandResponse, HandshakeAck, HandshakeMessage, MessageType,
    ProxyMessage,
};
pub use router::{MessageRouter, RouteOutcome};
