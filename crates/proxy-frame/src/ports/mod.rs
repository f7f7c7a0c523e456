//! Ports (hexagonal architecture) towards the embedding host.

pub mod outbound;

pub use outbound::{FrameChannel, FrameHost};
