//! Loader state machine for one connection attempt.
//!
//! ```text
//! Initiated ──start──▶ AwaitingLoad ──loaded──▶ AwaitingHandshake
//!                          │    ╲                   │        │
//!                          │     ╲──handshake──╮    │        │
//!                    load timeout              ▼    ▼   handshake timeout
//!                          │               Established       │
//!                          ▼                                 ▼
//!              Failed(LoadTimedOut)               Failed(InvalidFrame)
//! ```
//!
//! A handshake is accepted while waiting for the load signal as well: the
//! remote script may post before the host observes the load event.
//!
//! This type is pure; timers and the Loader Record table live in
//! `adapters::loaders`.

use crate::domain::correlation::FrameId;
use crate::domain::error::ConnectError;
use crate::domain::handshake::{verify_handshake, HandshakeClaim, HandshakeVerdict, RejectReason};
use crate::domain::origin::Origin;

/// Loader lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Initiated,
    AwaitingLoad,
    AwaitingHandshake,
    Established,
    Failed(LoadFailure),
}

impl LoaderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoaderState::Established | LoaderState::Failed(_))
    }
}

/// Terminal failure reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    LoadTimedOut,
    InvalidFrame,
}

impl From<LoadFailure> for ConnectError {
    fn from(failure: LoadFailure) -> Self {
        match failure {
            LoadFailure::LoadTimedOut => ConnectError::LoadTimedOut,
            LoadFailure::InvalidFrame => ConnectError::InvalidFrame,
        }
    }
}

/// Which wait a timer guards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderPhase {
    Load,
    Handshake,
}

impl LoaderPhase {
    fn state(self) -> LoaderState {
        match self {
            LoaderPhase::Load => LoaderState::AwaitingLoad,
            LoaderPhase::Handshake => LoaderState::AwaitingHandshake,
        }
    }

    fn failure(self) -> LoadFailure {
        match self {
            LoaderPhase::Load => LoadFailure::LoadTimedOut,
            LoaderPhase::Handshake => LoadFailure::InvalidFrame,
        }
    }
}

/// Result of feeding an event to the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Load wait started; arm the load timer
    Started,
    /// Load observed; cancel the load timer and arm the handshake timer
    Loaded,
    /// Handshake accepted; cancel timers and hand out the channel
    Established,
    /// A timer expired in its own phase
    Failed(LoadFailure),
    /// Handshake rejected; nothing changes
    Rejected(RejectReason),
    /// Event does not apply to the current state
    Ignored,
}

/// One connection attempt towards `target`.
#[derive(Debug, Clone)]
pub struct Loader {
    frame_id: FrameId,
    target: Origin,
    state: LoaderState,
}

impl Loader {
    pub fn new(frame_id: FrameId, target: Origin) -> Self {
        Self {
            frame_id,
            target,
            state: LoaderState::Initiated,
        }
    }

    pub fn frame_id(&self) -> &FrameId {
        &self.frame_id
    }

    pub fn target(&self) -> &Origin {
        &self.target
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    /// The embedded context has been created; wait for it to load.
    pub fn start(&mut self) -> Transition {
        match self.state {
            LoaderState::Initiated => {
                self.state = LoaderState::AwaitingLoad;
                Transition::Started
            }
            _ => Transition::Ignored,
        }
    }

    /// The embedded context signalled load completion.
    pub fn on_loaded(&mut self) -> Transition {
        match self.state {
            LoaderState::AwaitingLoad => {
                self.state = LoaderState::AwaitingHandshake;
                Transition::Loaded
            }
            _ => Transition::Ignored,
        }
    }

    /// A handshake addressed to this loader arrived from `sender_origin`.
    pub fn on_handshake(&mut self, claim: &HandshakeClaim<'_>, sender_origin: &str) -> Transition {
        if !matches!(
            self.state,
            LoaderState::AwaitingLoad | LoaderState::AwaitingHandshake
        ) {
            return Transition::Ignored;
        }

        match verify_handshake(&self.frame_id, &self.target, claim, sender_origin) {
            HandshakeVerdict::Accept => {
                self.state = LoaderState::Established;
                Transition::Established
            }
            HandshakeVerdict::Reject(reason) => Transition::Rejected(reason),
        }
    }

    /// The timer guarding `phase` fired. Stale timers are ignored.
    pub fn on_timeout(&mut self, phase: LoaderPhase) -> Transition {
        if self.state != phase.state() {
            return Transition::Ignored;
        }
        let failure = phase.failure();
        self.state = LoaderState::Failed(failure);
        Transition::Failed(failure)
    }
}
