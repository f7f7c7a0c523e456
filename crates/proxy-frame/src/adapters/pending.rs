//! Pending Request Table.
//!
//! Maps correlation IDs to the handles awaiting an execute response.
//!
//! Flow:
//! 1. `ProxyFrame::execute` encodes the request, minting a CorrelationId
//! 2. It calls `register()` to get a oneshot receiver
//! 3. It posts the request on the frame channel
//! 4. The router receives the response and calls `complete()`
//! 5. The `ResponseHandle` resolves, or expires the entry at its deadline
//!
//! Every entry leaves the table exactly once: `complete`, `expire` or `cancel`.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::ExecuteError;
use crate::domain::origin::Origin;
use crate::domain::request::HttpMethod;
use crate::domain::response::ProxyResponse;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// What a pending handle eventually receives
pub type ResponseResult = Result<ProxyResponse, ExecuteError>;

/// A request waiting for its response
struct PendingRequest {
    /// Channel to deliver the outcome
    sender: oneshot::Sender<ResponseResult>,
    /// Origin the request was posted to; responses must come from it
    origin: Origin,
    /// When the request was registered
    created_at: Instant,
    /// Method and URL (for logging)
    method: HttpMethod,
    url: String,
}

/// Statistics for the pending request table
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Responses delivered with status "ok"
    pub total_completed: AtomicU64,
    /// Responses delivered with any other status
    pub total_rejected: AtomicU64,
    /// Requests removed at their deadline
    pub total_timeouts: AtomicU64,
    /// Requests removed without a response (handle dropped, send failed)
    pub total_cancelled: AtomicU64,
}

pub struct PendingRequestTable {
    /// Map of correlation ID to pending request
    pending: DashMap<CorrelationId, PendingRequest>,
    /// Registration limit
    max_pending: usize,
    /// Reserved slots; taken before insertion so the limit holds under races
    reserved: AtomicUsize,
    /// Statistics
    stats: PendingStats,
}

impl PendingRequestTable {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: DashMap::new(),
            max_pending,
            reserved: AtomicUsize::new(0),
            stats: PendingStats::default(),
        }
    }

    /// Register a request posted to `origin` under `correlation_id`.
    pub fn register(
        &self,
        correlation_id: CorrelationId,
        origin: &Origin,
        method: HttpMethod,
        url: &str,
    ) -> Result<oneshot::Receiver<ResponseResult>, ExecuteError> {
        if !self.try_reserve() {
            warn!(
                correlation_id = %correlation_id,
                limit = self.max_pending,
                "Refusing request: pending table full"
            );
            return Err(ExecuteError::TooManyPending {
                limit: self.max_pending,
            });
        }

        let (tx, rx) = oneshot::channel();
        let request = PendingRequest {
            sender: tx,
            origin: origin.clone(),
            created_at: Instant::now(),
            method,
            url: url.to_string(),
        };

        if self.pending.insert(correlation_id, request).is_some() {
            // Replaced entry gives its slot back
            self.release();
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            origin = %origin,
            method = method.as_str(),
            url = url,
            "Registered pending request"
        );

        Ok(rx)
    }

    /// Deliver the outcome for `correlation_id` if it was sent by the origin
    /// the request went to.
    ///
    /// Returns false for unknown ids (already settled, never issued) and for
    /// responses from any other origin; the entry stays pending in that case.
    pub fn complete(
        &self,
        correlation_id: &CorrelationId,
        sender_origin: &str,
        outcome: ResponseResult,
    ) -> bool {
        let Some((_, pending)) = self
            .pending
            .remove_if(correlation_id, |_, p| p.origin.matches(sender_origin))
        else {
            if self.pending.contains_key(correlation_id) {
                debug!(
                    correlation_id = %correlation_id,
                    sender_origin = sender_origin,
                    "Dropping response from foreign origin"
                );
            } else {
                debug!(
                    correlation_id = %correlation_id,
                    "Response for unknown or settled correlation ID"
                );
            }
            return false;
        };
        self.release();

        let succeeded = outcome.is_ok();
        let response_time = pending.created_at.elapsed();

        match pending.sender.send(outcome) {
            Ok(()) => {
                let counter = if succeeded {
                    &self.stats.total_completed
                } else {
                    &self.stats.total_rejected
                };
                counter.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    method = pending.method.as_str(),
                    url = %pending.url,
                    succeeded = succeeded,
                    response_time_ms = response_time.as_millis(),
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                // Receiver was dropped between registration and response
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    "Pending request receiver dropped"
                );
                false
            }
        }
    }

    /// Remove an entry whose deadline passed.
    ///
    /// Returns false if a response already claimed it.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        match self.pending.remove(correlation_id) {
            Some((_, request)) => {
                self.release();
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    correlation_id = %correlation_id,
                    method = request.method.as_str(),
                    url = %request.url,
                    elapsed_ms = request.created_at.elapsed().as_millis(),
                    "Pending request expired"
                );
                true
            }
            None => false,
        }
    }

    /// Remove an entry without a response
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.release();
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %correlation_id, "Cancelled pending request");
            true
        } else {
            false
        }
    }

    /// Get number of currently pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation ID is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    fn try_reserve(&self) -> bool {
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_pending).then_some(n + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        self.reserved.fetch_sub(1, Ordering::AcqRel);
    }
}
