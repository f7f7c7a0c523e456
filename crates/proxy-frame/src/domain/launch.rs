//! Launch parameters delivered to a new embedded context.
//!
//! Carried out-of-band in the URL fragment of the frame source as
//! percent-encoded JSON, so the remote script can address messages back to
//! the host before any channel traffic exists.

use crate::domain::correlation::FrameId;
use crate::domain::origin::Origin;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchParams {
    pub id: String,
    pub scripts_base: String,
    pub parent_origin: String,
}

impl LaunchParams {
    pub fn new(frame_id: &FrameId, scripts_base: &Url, parent_origin: &Origin) -> Self {
        Self {
            id: frame_id.to_string(),
            scripts_base: scripts_base.to_string(),
            parent_origin: parent_origin.to_string(),
        }
    }

    /// Copy of `source` with these parameters in its fragment.
    pub fn apply_to(&self, source: &Url) -> Result<Url, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        let encoded: String = form_urlencoded::byte_serialize(json.as_bytes()).collect();

        let mut url = source.clone();
        url.set_fragment(Some(&encoded));
        Ok(url)
    }

    /// Read parameters back from a frame source, as the remote side does.
    pub fn from_url(url: &Url) -> Option<Self> {
        let fragment = url.fragment()?;
        // The encoded form has no raw '&' or '=', so it parses as one key
        let (decoded, _) = form_urlencoded::parse(fragment.as_bytes()).next()?;
        serde_json::from_str(&decoded).ok()
    }
}
