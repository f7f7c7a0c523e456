//! Frame Registry: established facades by origin.
//!
//! Entries are added once per origin and live as long as the service.

use crate::domain::origin::Origin;
use crate::frame::ProxyFrame;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct FrameRegistry {
    frames: DashMap<Origin, Arc<ProxyFrame>>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, origin: &Origin) -> Option<Arc<ProxyFrame>> {
        self.frames.get(origin).map(|entry| Arc::clone(entry.value()))
    }

    /// Store `frame` unless the origin already has one; returns the stored facade.
    pub fn insert(&self, frame: Arc<ProxyFrame>) -> Arc<ProxyFrame> {
        let entry = self.frames.entry(frame.origin().clone()).or_insert(frame);
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
