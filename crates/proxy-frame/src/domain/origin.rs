//! Origin: the trust boundary and registry key.

use crate::domain::error::OriginError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// ASCII serialization of a tuple origin (`scheme://host[:port]`).
///
/// Comparisons against a sender are exact string matches; no normalization
/// beyond what the URL parser does is applied to the observed side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin(String);

impl Origin {
    /// Derive the origin of a URL. Opaque origins (`data:`, `file:`) are rejected.
    pub fn from_url(url: &Url) -> Result<Self, OriginError> {
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(OriginError::Opaque(url.to_string()));
        }
        Ok(Self(origin.ascii_serialization()))
    }

    /// Parse a URL (or a bare origin) and take its origin.
    pub fn parse(s: &str) -> Result<Self, OriginError> {
        let url = Url::parse(s)?;
        Self::from_url(&url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact match against an origin observed on the channel.
    pub fn matches(&self, observed: &str) -> bool {
        self.0 == observed
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Origin {
    type Error = OriginError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.0
    }
}
