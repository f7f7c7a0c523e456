//! Response value built from an execute-command response.

use crate::domain::error::DataDecodingError;
use serde::de::DeserializeOwned;
use std::fmt;

/// Status string a remote frame sends for a successful execution
pub const STATUS_OK: &str = "ok";

/// Normalized outcome derived from the raw status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    None,
    Success,
    NotModified,
    Timeout,
    Error,
}

impl ResponseStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => ResponseStatus::None,
            200 => ResponseStatus::Success,
            304 => ResponseStatus::NotModified,
            408 => ResponseStatus::Timeout,
            _ => ResponseStatus::Error,
        }
    }
}

/// Body after content-type guided decoding
#[derive(Debug, Clone, PartialEq)]
pub enum GuessedBody<'a> {
    Structured(serde_json::Value),
    Raw(&'a str),
}

/// Immutable response of a proxied request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    status: String,
    content_type: String,
    status_code: u16,
    http_status: u16,
    http_status_text: String,
    data: String,
}

impl ProxyResponse {
    pub fn new(
        status: impl Into<String>,
        content_type: impl Into<String>,
        status_code: u16,
        http_status: u16,
        http_status_text: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            status: status.into(),
            content_type: content_type.into(),
            status_code,
            http_status,
            http_status_text: http_status_text.into(),
            data: data.into(),
        }
    }

    /// Execution status reported by the remote frame ("ok" on success)
    pub fn remote_status(&self) -> &str {
        &self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status(&self) -> ResponseStatus {
        ResponseStatus::from_code(self.status_code)
    }

    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    pub fn http_status_text(&self) -> &str {
        &self.http_status_text
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Case-insensitive prefix match on the declared content type
    pub fn is_content_type(&self, content_type: &str) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .starts_with(&content_type.to_ascii_lowercase())
    }

    /// Literal body as received
    pub fn raw_body(&self) -> &str {
        &self.data
    }

    /// Structured value for JSON content types, the raw string otherwise.
    pub fn guessed_body(&self) -> Result<GuessedBody<'_>, DataDecodingError> {
        if is_json_content_type(&self.content_type) {
            self.decode_as_structured().map(GuessedBody::Structured)
        } else {
            Ok(GuessedBody::Raw(&self.data))
        }
    }

    /// Parse the body as JSON regardless of the declared content type.
    pub fn decode_as_structured(&self) -> Result<serde_json::Value, DataDecodingError> {
        Ok(serde_json::from_str(&self.data)?)
    }

    /// Parse the body into a typed value.
    pub fn decode_as<T: DeserializeOwned>(&self) -> Result<T, DataDecodingError> {
        Ok(serde_json::from_str(&self.data)?)
    }

    /// Parse the body as a JSON object.
    pub fn decode_as_map(
        &self,
    ) -> Result<serde_json::Map<String, serde_json::Value>, DataDecodingError> {
        self.decode_as()
    }
}

impl fmt::Display for ProxyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status {} (code {}, http {} {})",
            self.status, self.status_code, self.http_status, self.http_status_text
        )
    }
}

/// `application/json`, `text/json` and `+json` suffixed media types.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence == "text/json" || essence.ends_with("+json")
}
