//! Outbound ports: what the protocol needs from its host environment.
//!
//! The host owns the embedded surfaces and the message channel. It drives
//! the protocol by calling back into [`crate::ProxyFrameService`]:
//!
//! - `frame_loaded(frame_id)` when a mounted context finishes loading
//! - `handle_message(sender_origin, raw)` for every message received
//!
//! Both callbacks are discrete events and must not be issued from inside
//! [`FrameHost::mount`] or [`FrameChannel::post_message`].

use crate::domain::correlation::FrameId;
use crate::domain::error::{ChannelError, HostError};
use crate::domain::origin::Origin;
use std::sync::Arc;
use url::Url;

/// Send capability towards one embedded context.
pub trait FrameChannel: Send + Sync {
    /// Post a serialized envelope, restricted to `target_origin`.
    fn post_message(&self, message: &str, target_origin: &Origin) -> Result<(), ChannelError>;
}

/// Creates and removes embedded contexts.
pub trait FrameHost: Send + Sync {
    /// Create an embedded context loading `source` and return its channel.
    fn mount(&self, frame_id: &FrameId, source: &Url) -> Result<Arc<dyn FrameChannel>, HostError>;

    /// Tear down the context created for `frame_id`. Unknown ids are ignored.
    fn unmount(&self, frame_id: &FrameId);
}
