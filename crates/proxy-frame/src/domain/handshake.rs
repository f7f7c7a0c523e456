//! Handshake verification (security-critical).
//!
//! A remote frame proves it is the context we launched by echoing the frame
//! id from its launch parameters and declaring the origin it runs on. Only
//! the observed sender origin is trusted; the declared one must agree with it.

use crate::domain::correlation::FrameId;
use crate::domain::origin::Origin;

/// Handshake content as declared by the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeClaim<'a> {
    pub frame_id: &'a str,
    pub frame_origin: &'a str,
}

/// Outcome of verifying a handshake against a pending loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeVerdict {
    Accept,
    Reject(RejectReason),
}

/// Reasons for silently dropping a handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Declared origin differs from the channel's observed origin
    DeclaredOriginMismatch,
    /// Message came from an origin other than the one the frame was loaded from
    SenderNotTarget,
    /// Frame id does not name this loader
    FrameIdMismatch,
}

/// Verify a handshake claim for the loader `(frame_id, target)`.
///
/// # Security
/// 1. `frame_origin` must equal the physically observed sender origin
/// 2. the sender must be the origin the frame was launched on
/// 3. the claimed frame id must be this loader's id
///
/// All comparisons are exact.
pub fn verify_handshake(
    frame_id: &FrameId,
    target: &Origin,
    claim: &HandshakeClaim<'_>,
    sender_origin: &str,
) -> HandshakeVerdict {
    if claim.frame_origin != sender_origin {
        return HandshakeVerdict::Reject(RejectReason::DeclaredOriginMismatch);
    }

    if !target.matches(sender_origin) {
        return HandshakeVerdict::Reject(RejectReason::SenderNotTarget);
    }

    // Byte-for-byte against the rendering sent in the launch parameters
    if claim.frame_id != frame_id.to_string() {
        return HandshakeVerdict::Reject(RejectReason::FrameIdMismatch);
    }

    HandshakeVerdict::Accept
}
