//! Proxy frame service: the coordinator owning every table.
//!
//! One instance is created at startup and shared (it is cheap to clone).
//! The host environment feeds it events through [`ProxyFrameService::frame_loaded`]
//! and [`ProxyFrameService::handle_message`].

use crate::adapters::loaders::LoaderTable;
use crate::adapters::pending::{PendingRequestTable, PendingStats};
use crate::adapters::registry::FrameRegistry;
use crate::domain::config::ProxyFrameConfig;
use crate::domain::correlation::FrameId;
use crate::domain::error::{ConfigError, ConnectError};
use crate::domain::origin::Origin;
use crate::frame::ProxyFrame;
use crate::ipc::router::{MessageRouter, RouteOutcome};
use crate::ports::outbound::FrameHost;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Outcome shared by every caller waiting on one origin
type ConnectAttempt = Shared<BoxFuture<'static, Result<Arc<ProxyFrame>, ConnectError>>>;

#[derive(Clone)]
pub struct ProxyFrameService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: ProxyFrameConfig,
    scripts_base: Url,
    parent_origin: Origin,
    host: Arc<dyn FrameHost>,
    registry: FrameRegistry,
    connecting: DashMap<Origin, ConnectAttempt>,
    loaders: Arc<LoaderTable>,
    pending: Arc<PendingRequestTable>,
    router: MessageRouter,
}

impl ProxyFrameService {
    /// Create a new proxy frame service
    pub fn new(config: ProxyFrameConfig, host: Arc<dyn FrameHost>) -> Result<Self, ConfigError> {
        config.validate()?;

        let scripts_base = config.scripts_base_url()?;
        let parent_origin = config.parent_origin()?;

        let loaders = Arc::new(LoaderTable::new(
            Arc::clone(&host),
            config.load_timeout,
            config.handshake_timeout,
        ));
        let pending = Arc::new(PendingRequestTable::new(config.max_pending_requests));
        let router = MessageRouter::new(Arc::clone(&loaders), Arc::clone(&pending));

        info!(
            parent_origin = %parent_origin,
            load_timeout_ms = config.load_timeout.as_millis(),
            handshake_timeout_ms = config.handshake_timeout.as_millis(),
            request_timeout_ms = ?config.request_timeout.map(|t| t.as_millis()),
            "Proxy frame service created"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                scripts_base,
                parent_origin,
                host,
                registry: FrameRegistry::new(),
                connecting: DashMap::new(),
                loaders,
                pending,
                router,
            }),
        })
    }

    /// Get the facade for the origin of `source`, connecting if needed.
    ///
    /// An established facade is returned as is. Concurrent calls for an
    /// origin that is still connecting share that attempt. A failed attempt
    /// caches nothing, so the next call starts over.
    pub async fn create(&self, source: &Url) -> Result<Arc<ProxyFrame>, ConnectError> {
        let origin = Origin::from_url(source)?;

        if let Some(frame) = self.inner.registry.get(&origin) {
            debug!(origin = %origin, "Reusing established frame");
            return Ok(frame);
        }

        let attempt = match self.inner.connecting.entry(origin.clone()) {
            Entry::Occupied(entry) => {
                debug!(origin = %origin, "Joining connection attempt in flight");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // Established between the lookup above and taking the entry
                if let Some(frame) = self.inner.registry.get(&origin) {
                    return Ok(frame);
                }

                let inner = Arc::clone(&self.inner);
                let attempt = inner.connect(origin, source.clone()).boxed().shared();
                entry.insert(attempt.clone());
                // Runs to completion even if every caller stops waiting
                tokio::spawn(attempt.clone());
                attempt
            }
        };

        attempt.await
    }

    /// Look up an established facade without connecting.
    pub fn get(&self, origin: &Origin) -> Option<Arc<ProxyFrame>> {
        self.inner.registry.get(origin)
    }

    /// The embedded context for `frame_id` finished loading.
    pub fn frame_loaded(&self, frame_id: &FrameId) -> bool {
        self.inner.loaders.on_loaded(frame_id)
    }

    /// Feed one message observed from `sender_origin`.
    pub fn handle_message(&self, sender_origin: &str, raw: &str) -> RouteOutcome {
        self.inner.router.route(sender_origin, raw)
    }

    pub fn config(&self) -> &ProxyFrameConfig {
        &self.inner.config
    }

    pub fn frame_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Connection attempts that have not settled yet
    pub fn loader_count(&self) -> usize {
        self.inner.loaders.len()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.pending_count()
    }

    pub fn pending_stats(&self) -> &PendingStats {
        self.inner.pending.stats()
    }
}

impl ServiceInner {
    async fn connect(
        self: Arc<Self>,
        origin: Origin,
        source: Url,
    ) -> Result<Arc<ProxyFrame>, ConnectError> {
        let result = self.establish(&origin, &source).await;
        // The registry already holds the frame on success
        self.connecting.remove(&origin);
        result
    }

    async fn establish(&self, origin: &Origin, source: &Url) -> Result<Arc<ProxyFrame>, ConnectError> {
        let load = self
            .loaders
            .start(origin.clone(), source, &self.scripts_base, &self.parent_origin)?;
        let frame_id = *load.frame_id();

        let channel = load.wait().await?;

        let frame = Arc::new(ProxyFrame::new(
            frame_id,
            origin.clone(),
            channel,
            Arc::clone(&self.pending),
            self.config.request_timeout,
        ));

        if let Err(e) = frame.acknowledge() {
            warn!(frame_id = %frame_id, origin = %origin, error = %e, "Handshake acknowledgement failed");
            self.host.unmount(&frame_id);
            return Err(e);
        }

        let frame = self.registry.insert(frame);
        info!(frame_id = %frame.frame_id(), origin = %origin, "Proxy frame established");
        Ok(frame)
    }
}
