//! Wire envelope codec.
//!
//! Wire format (JSON text):
//!
//! ```text
//! { "id": string, "type": string, "data": object }
//! ```
//!
//! `decode` validates the envelope shape, the `type` discriminant and the
//! `data` payload for that type in one pass and never panics; callers treat
//! any error as "drop this message".

use crate::domain::correlation::CorrelationId;
use crate::ipc::messages::{MessageType, ProxyMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope decoding/encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Not JSON, or missing `id`/`type`
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("envelope data must be an object")]
    DataNotObject,

    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },

    #[error("envelope encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decoded envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Correlation id for requests, arbitrary for pushes
    pub id: String,
    pub message: ProxyMessage,
}

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decode and validate a raw inbound message.
pub fn decode(raw: &str) -> Result<Envelope, EnvelopeError> {
    let wire: WireEnvelope = serde_json::from_str(raw).map_err(EnvelopeError::Malformed)?;

    let kind =
        MessageType::from_wire(&wire.kind).ok_or_else(|| EnvelopeError::UnknownType(wire.kind))?;

    if !wire.data.is_object() {
        return Err(EnvelopeError::DataNotObject);
    }

    let invalid = |source| EnvelopeError::InvalidPayload { kind, source };
    let message = match kind {
        MessageType::ProxyFrameHandshake => {
            ProxyMessage::Handshake(serde_json::from_value(wire.data).map_err(invalid)?)
        }
        MessageType::ProxyFrameHandshakeAck => {
            ProxyMessage::HandshakeAck(serde_json::from_value(wire.data).map_err(invalid)?)
        }
        MessageType::ProxyFrameExecuteCommandRequest => {
            ProxyMessage::ExecuteRequest(serde_json::from_value(wire.data).map_err(invalid)?)
        }
        MessageType::ProxyFrameExecuteCommandResponse => {
            ProxyMessage::ExecuteResponse(serde_json::from_value(wire.data).map_err(invalid)?)
        }
    };

    Ok(Envelope {
        id: wire.id,
        message,
    })
}

/// Encode a message under a freshly minted correlation id.
pub fn encode(message: &ProxyMessage) -> Result<(CorrelationId, String), EnvelopeError> {
    let id = CorrelationId::new();
    let wire = encode_with_id(&id.to_string(), message)?;
    Ok((id, wire))
}

/// Encode a message under a caller-chosen id.
pub fn encode_with_id(id: &str, message: &ProxyMessage) -> Result<String, EnvelopeError> {
    let data = match message {
        ProxyMessage::Handshake(m) => serde_json::to_value(m),
        ProxyMessage::HandshakeAck(m) => serde_json::to_value(m),
        ProxyMessage::ExecuteRequest(m) => serde_json::to_value(m),
        ProxyMessage::ExecuteResponse(m) => serde_json::to_value(m),
    }
    .map_err(EnvelopeError::Encode)?;

    let wire = WireEnvelope {
        id: id.to_string(),
        kind: message.message_type().as_str().to_string(),
        data,
    };
    serde_json::to_string(&wire).map_err(EnvelopeError::Encode)
}
