//! Message Router: decodes inbound traffic and dispatches it.
//!
//! Every inbound message goes through one `route` call. Nothing here
//! propagates an error to the host: malformed, spoofed and stale messages
//! are logged and dropped.

use crate::adapters::loaders::LoaderTable;
use crate::adapters::pending::PendingRequestTable;
use crate::domain::correlation::CorrelationId;
use crate::domain::error::ExecuteError;
use crate::domain::handshake::HandshakeClaim;
use crate::domain::response::ProxyResponse;
use crate::ipc::envelope;
use crate::ipc::messages::{MessageType, ProxyMessage};
use std::sync::Arc;
use tracing::trace;

/// What happened to one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Not a valid envelope
    Malformed,
    /// Handshake established a pending loader
    HandshakeAccepted,
    /// Handshake named no loader or failed verification
    HandshakeDropped,
    /// Response settled a pending request
    ResponseDelivered,
    /// Response matched no pending request from that origin
    ResponseDropped,
    /// Valid message of a type the host does not consume
    Ignored(MessageType),
}

pub struct MessageRouter {
    loaders: Arc<LoaderTable>,
    pending: Arc<PendingRequestTable>,
}

impl MessageRouter {
    pub fn new(loaders: Arc<LoaderTable>, pending: Arc<PendingRequestTable>) -> Self {
        Self { loaders, pending }
    }

    /// Handle one message observed from `sender_origin`.
    pub fn route(&self, sender_origin: &str, raw: &str) -> RouteOutcome {
        let envelope = match envelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                trace!(sender_origin = sender_origin, error = %e, "Dropping malformed message");
                return RouteOutcome::Malformed;
            }
        };

        match envelope.message {
            ProxyMessage::Handshake(handshake) => {
                let claim = HandshakeClaim {
                    frame_id: &handshake.frame_id,
                    frame_origin: &handshake.frame_origin,
                };
                if self.loaders.on_handshake(&claim, sender_origin) {
                    RouteOutcome::HandshakeAccepted
                } else {
                    trace!(sender_origin = sender_origin, "Handshake dropped");
                    RouteOutcome::HandshakeDropped
                }
            }
            ProxyMessage::ExecuteResponse(message) => {
                let Ok(correlation_id) = CorrelationId::parse(&message.request_id) else {
                    trace!(request_id = %message.request_id, "Response with unparsable request id");
                    return RouteOutcome::ResponseDropped;
                };

                let response = ProxyResponse::from(message);
                let outcome = if response.is_ok() {
                    Ok(response)
                } else {
                    Err(ExecuteError::Remote(Box::new(response)))
                };

                if self.pending.complete(&correlation_id, sender_origin, outcome) {
                    RouteOutcome::ResponseDelivered
                } else {
                    RouteOutcome::ResponseDropped
                }
            }
            other => {
                let kind = other.message_type();
                trace!(sender_origin = sender_origin, message_type = %kind, "Ignoring message");
                RouteOutcome::Ignored(kind)
            }
        }
    }
}
