//! Loader Record table and its timers.
//!
//! Each connection attempt is a [`Loader`] keyed by its [`FrameId`]. The
//! record also holds the channel returned by the host, the completer of the
//! caller's handle and the timer guarding the current wait.
//!
//! All transitions happen under one lock. Timers are tokio tasks holding a
//! weak reference to the table; a timer that fires after its phase ended
//! finds the loader in another state and does nothing.

use crate::domain::correlation::FrameId;
use crate::domain::error::ConnectError;
use crate::domain::handshake::HandshakeClaim;
use crate::domain::launch::LaunchParams;
use crate::domain::loader::{Loader, LoaderPhase, Transition};
use crate::domain::origin::Origin;
use crate::ports::outbound::{FrameChannel, FrameHost};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// Outcome delivered to whoever waits on a connection attempt
pub type LoadResult = Result<Arc<dyn FrameChannel>, ConnectError>;

struct LoaderRecord {
    loader: Loader,
    channel: Arc<dyn FrameChannel>,
    completer: oneshot::Sender<LoadResult>,
    timer: Option<JoinHandle<()>>,
}

impl LoaderRecord {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Handle on an in-flight connection attempt.
pub struct PendingLoad {
    frame_id: FrameId,
    rx: oneshot::Receiver<LoadResult>,
}

impl PendingLoad {
    pub fn frame_id(&self) -> &FrameId {
        &self.frame_id
    }

    /// Wait for the loader to settle.
    pub async fn wait(self) -> LoadResult {
        self.rx.await.unwrap_or(Err(ConnectError::Abandoned))
    }
}

pub struct LoaderTable {
    records: Mutex<HashMap<FrameId, LoaderRecord>>,
    host: Arc<dyn FrameHost>,
    load_timeout: Duration,
    handshake_timeout: Duration,
}

impl LoaderTable {
    pub fn new(host: Arc<dyn FrameHost>, load_timeout: Duration, handshake_timeout: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            host,
            load_timeout,
            handshake_timeout,
        }
    }

    /// Start a connection attempt: mint a frame id, mount the context with
    /// its launch parameters and arm the load timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        self: &Arc<Self>,
        target: Origin,
        source: &Url,
        scripts_base: &Url,
        parent_origin: &Origin,
    ) -> Result<PendingLoad, ConnectError> {
        let frame_id = FrameId::new();
        let launch_url = LaunchParams::new(&frame_id, scripts_base, parent_origin)
            .apply_to(source)
            .map_err(|e| ConnectError::Encode(e.to_string()))?;

        let channel = self.host.mount(&frame_id, &launch_url)?;

        let mut loader = Loader::new(frame_id, target);
        loader.start();

        let (tx, rx) = oneshot::channel();
        let record = LoaderRecord {
            loader,
            channel,
            completer: tx,
            timer: Some(self.arm(frame_id, LoaderPhase::Load)),
        };
        self.records.lock().insert(frame_id, record);

        debug!(
            frame_id = %frame_id,
            source = %source,
            timeout_ms = self.load_timeout.as_millis(),
            "Loader started, awaiting load"
        );

        Ok(PendingLoad { frame_id, rx })
    }

    /// The context for `frame_id` finished loading.
    ///
    /// Returns false when no loader is waiting for that signal.
    pub fn on_loaded(self: &Arc<Self>, frame_id: &FrameId) -> bool {
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(frame_id) else {
            debug!(frame_id = %frame_id, "Load signal for unknown frame");
            return false;
        };

        match record.loader.on_loaded() {
            Transition::Loaded => {
                record.cancel_timer();
                record.timer = Some(self.arm(*frame_id, LoaderPhase::Handshake));
                debug!(
                    frame_id = %frame_id,
                    timeout_ms = self.handshake_timeout.as_millis(),
                    "Frame loaded, awaiting handshake"
                );
                true
            }
            _ => false,
        }
    }

    /// Route a handshake to the loader it names.
    ///
    /// On acceptance the record is removed and the waiting handle receives
    /// the channel. Anything else is dropped and the loader keeps waiting.
    pub fn on_handshake(&self, claim: &HandshakeClaim<'_>, sender_origin: &str) -> bool {
        let Ok(frame_id) = FrameId::parse(claim.frame_id) else {
            debug!(claimed_frame_id = claim.frame_id, "Handshake with unparsable frame id");
            return false;
        };

        let mut records = self.records.lock();
        let Some(record) = records.get_mut(&frame_id) else {
            debug!(frame_id = %frame_id, "Handshake for unknown frame");
            return false;
        };

        match record.loader.on_handshake(claim, sender_origin) {
            Transition::Established => {}
            Transition::Rejected(reason) => {
                debug!(
                    frame_id = %frame_id,
                    sender_origin = sender_origin,
                    ?reason,
                    "Dropping handshake"
                );
                return false;
            }
            _ => return false,
        }

        let Some(mut record) = records.remove(&frame_id) else {
            return false;
        };
        drop(records);

        record.cancel_timer();
        debug!(frame_id = %frame_id, origin = %record.loader.target(), "Handshake accepted");

        if record.completer.send(Ok(record.channel)).is_err() {
            debug!(frame_id = %frame_id, "Nobody awaits the established frame");
            self.host.unmount(&frame_id);
        }
        true
    }

    fn on_timeout(&self, frame_id: &FrameId, phase: LoaderPhase) {
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(frame_id) else {
            return;
        };

        let Transition::Failed(failure) = record.loader.on_timeout(phase) else {
            return;
        };

        let Some(record) = records.remove(frame_id) else {
            return;
        };
        drop(records);

        let error = ConnectError::from(failure);
        warn!(
            frame_id = %frame_id,
            origin = %record.loader.target(),
            ?phase,
            error = %error,
            "Loader failed"
        );

        self.host.unmount(frame_id);
        let _ = record.completer.send(Err(error));
    }

    fn arm(self: &Arc<Self>, frame_id: FrameId, phase: LoaderPhase) -> JoinHandle<()> {
        let delay = match phase {
            LoaderPhase::Load => self.load_timeout,
            LoaderPhase::Handshake => self.handshake_timeout,
        };
        let table: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(table) = table.upgrade() {
                table.on_timeout(&frame_id, phase);
            }
        })
    }

    /// Number of live loaders
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn contains(&self, frame_id: &FrameId) -> bool {
        self.records.lock().contains_key(frame_id)
    }
}
