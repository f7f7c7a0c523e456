//! Request description handed to a remote frame for execution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// HTTP method, serialized upper-case on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

/// What to execute: method, target URL and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Add (or replace) a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Optional request body.
///
/// Structured bodies are flattened to a plain JSON object before they are
/// put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Fields(BTreeMap<String, serde_json::Value>),
}

impl RequestBody {
    /// Wire form of the body
    pub fn into_value(self) -> serde_json::Value {
        match self {
            RequestBody::Text(text) => serde_json::Value::String(text),
            RequestBody::Fields(fields) => serde_json::Value::Object(fields.into_iter().collect()),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<BTreeMap<String, serde_json::Value>> for RequestBody {
    fn from(fields: BTreeMap<String, serde_json::Value>) -> Self {
        RequestBody::Fields(fields)
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for RequestBody {
    fn from_iter<I: IntoIterator<Item = (K, serde_json::Value)>>(iter: I) -> Self {
        RequestBody::Fields(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
