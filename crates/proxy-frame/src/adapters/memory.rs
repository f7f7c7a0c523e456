//! In-memory frame host.
//!
//! Records every mount, unmount and posted message so tests can play the
//! remote side: read the launch parameters, answer with a handshake, reply
//! to execute requests.

use crate::domain::correlation::FrameId;
use crate::domain::error::{ChannelError, HostError};
use crate::domain::launch::LaunchParams;
use crate::domain::origin::Origin;
use crate::ipc::envelope::{self, Envelope};
use crate::ipc::messages::{
    ExecuteCommandRequest, ExecuteCommandResponse, HandshakeMessage, ProxyMessage,
};
use crate::ports::outbound::{FrameChannel, FrameHost};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

/// A message posted through a [`MemoryChannel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub target_origin: Origin,
    pub payload: String,
}

/// Channel that stores outbound messages instead of delivering them.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    outbox: Mutex<Vec<PostedMessage>>,
    closed: AtomicBool,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every further post fail with [`ChannelError::Closed`]
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn posted(&self) -> Vec<PostedMessage> {
        self.outbox.lock().clone()
    }

    /// Posted messages that decode as envelopes, in order
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.outbox
            .lock()
            .iter()
            .filter_map(|m| envelope::decode(&m.payload).ok())
            .collect()
    }

    /// Execute requests posted so far with their correlation ids
    pub fn requests(&self) -> Vec<(String, ExecuteCommandRequest)> {
        self.envelopes()
            .into_iter()
            .filter_map(|e| match e.message {
                ProxyMessage::ExecuteRequest(request) => Some((e.id, request)),
                _ => None,
            })
            .collect()
    }

    pub fn ack_count(&self) -> usize {
        self.envelopes()
            .iter()
            .filter(|e| matches!(e.message, ProxyMessage::HandshakeAck(_)))
            .count()
    }
}

impl FrameChannel for MemoryChannel {
    fn post_message(&self, message: &str, target_origin: &Origin) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        self.outbox.lock().push(PostedMessage {
            target_origin: target_origin.clone(),
            payload: message.to_string(),
        });
        Ok(())
    }
}

struct MountedFrame {
    frame_id: FrameId,
    source: Url,
    channel: Arc<MemoryChannel>,
    mounted: bool,
}

/// [`FrameHost`] that keeps its frames in memory.
pub struct MemoryFrameHost {
    frames: Mutex<Vec<MountedFrame>>,
    fail_next: Mutex<Option<HostError>>,
    mounts: watch::Sender<usize>,
}

impl Default for MemoryFrameHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFrameHost {
    pub fn new() -> Self {
        let (mounts, _) = watch::channel(0);
        Self {
            frames: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            mounts,
        }
    }

    /// Fail the next `mount` call with `error`
    pub fn fail_next_mount(&self, error: HostError) {
        *self.fail_next.lock() = Some(error);
    }

    /// Total successful mounts, including frames unmounted since
    pub fn mount_count(&self) -> usize {
        self.frames.lock().len()
    }

    /// Wait until `count` frames have been mounted and return the last of them.
    pub async fn wait_for_mount(&self, count: usize) -> Option<FrameId> {
        let mut rx = self.mounts.subscribe();
        rx.wait_for(|mounted| *mounted >= count).await.ok()?;
        let frames = self.frames.lock();
        frames.get(count.checked_sub(1)?).map(|f| f.frame_id)
    }

    pub fn is_mounted(&self, frame_id: &FrameId) -> bool {
        self.frames
            .lock()
            .iter()
            .any(|f| f.frame_id == *frame_id && f.mounted)
    }

    /// The URL the frame was mounted with, launch fragment included
    pub fn source(&self, frame_id: &FrameId) -> Option<Url> {
        self.find(frame_id, |f| f.source.clone())
    }

    /// Launch parameters as the remote script would read them
    pub fn launch_params(&self, frame_id: &FrameId) -> Option<LaunchParams> {
        LaunchParams::from_url(&self.source(frame_id)?)
    }

    pub fn channel(&self, frame_id: &FrameId) -> Option<Arc<MemoryChannel>> {
        self.find(frame_id, |f| Arc::clone(&f.channel))
    }

    fn find<T>(&self, frame_id: &FrameId, f: impl FnOnce(&MountedFrame) -> T) -> Option<T> {
        self.frames.lock().iter().find(|m| m.frame_id == *frame_id).map(f)
    }
}

impl FrameHost for MemoryFrameHost {
    fn mount(&self, frame_id: &FrameId, source: &Url) -> Result<Arc<dyn FrameChannel>, HostError> {
        if let Some(error) = self.fail_next.lock().take() {
            return Err(error);
        }

        let channel = Arc::new(MemoryChannel::new());
        self.frames.lock().push(MountedFrame {
            frame_id: *frame_id,
            source: source.clone(),
            channel: Arc::clone(&channel),
            mounted: true,
        });
        self.mounts.send_modify(|mounted| *mounted += 1);

        Ok(channel)
    }

    fn unmount(&self, frame_id: &FrameId) {
        for frame in self.frames.lock().iter_mut() {
            if frame.frame_id == *frame_id {
                frame.mounted = false;
            }
        }
    }
}

/// Wire text of a handshake as a remote frame would post it.
pub fn handshake_wire(frame_id: &str, frame_origin: &str) -> String {
    let message = ProxyMessage::Handshake(HandshakeMessage {
        frame_id: frame_id.to_string(),
        frame_origin: frame_origin.to_string(),
    });
    // Plain string fields always serialize
    envelope::encode_with_id("handshake", &message).unwrap_or_default()
}

/// Wire text of an execute response to `request_id`.
pub fn response_wire(
    request_id: &str,
    status: &str,
    status_code: u16,
    content_type: &str,
    data: &str,
) -> String {
    let message = ProxyMessage::ExecuteResponse(ExecuteCommandResponse {
        request_id: request_id.to_string(),
        status: status.to_string(),
        content_type: content_type.to_string(),
        status_code,
        http_status: status_code,
        http_status_text: String::new(),
        data: data.to_string(),
    });
    envelope::encode_with_id(request_id, &message).unwrap_or_default()
}
