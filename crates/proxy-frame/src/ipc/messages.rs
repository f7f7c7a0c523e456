//! Message payloads exchanged with remote frames.
//!
//! The set is closed: anything that is not one of these four shapes is
//! rejected by the codec before it reaches a handler.

use crate::domain::request::HttpMethod;
use crate::domain::response::ProxyResponse;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Envelope `type` discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// embedded → host
    ProxyFrameHandshake,
    /// host → embedded, once on establishment
    ProxyFrameHandshakeAck,
    /// host → embedded
    ProxyFrameExecuteCommandRequest,
    /// embedded → host
    ProxyFrameExecuteCommandResponse,
}

impl MessageType {
    pub const ALL: [MessageType; 4] = [
        MessageType::ProxyFrameHandshake,
        MessageType::ProxyFrameHandshakeAck,
        MessageType::ProxyFrameExecuteCommandRequest,
        MessageType::ProxyFrameExecuteCommandResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::ProxyFrameHandshake => "ProxyFrameHandshake",
            MessageType::ProxyFrameHandshakeAck => "ProxyFrameHandshakeAck",
            MessageType::ProxyFrameExecuteCommandRequest => "ProxyFrameExecuteCommandRequest",
            MessageType::ProxyFrameExecuteCommandResponse => "ProxyFrameExecuteCommandResponse",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote frame announces itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeMessage {
    pub frame_id: String,
    pub frame_origin: String,
}

/// Host confirms the handshake; carries no fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeAck {}

/// Request for the remote frame to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteCommandRequest {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Outcome reported by the remote frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandResponse {
    pub request_id: String,
    pub status: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub http_status: u16,
    #[serde(default)]
    pub http_status_text: String,
    #[serde(default)]
    pub data: String,
}

impl From<ExecuteCommandResponse> for ProxyResponse {
    fn from(message: ExecuteCommandResponse) -> Self {
        ProxyResponse::new(
            message.status,
            message.content_type,
            message.status_code,
            message.http_status,
            message.http_status_text,
            message.data,
        )
    }
}

/// All protocol messages
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyMessage {
    Handshake(HandshakeMessage),
    HandshakeAck(HandshakeAck),
    ExecuteRequest(ExecuteCommandRequest),
    ExecuteResponse(ExecuteCommandResponse),
}

impl ProxyMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ProxyMessage::Handshake(_) => MessageType::ProxyFrameHandshake,
            ProxyMessage::HandshakeAck(_) => MessageType::ProxyFrameHandshakeAck,
            ProxyMessage::ExecuteRequest(_) => MessageType::ProxyFrameExecuteCommandRequest,
            ProxyMessage::ExecuteResponse(_) => MessageType::ProxyFrameExecuteCommandResponse,
        }
    }
}
