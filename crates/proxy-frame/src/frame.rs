//! Remote Proxy Facade.
//!
//! A [`ProxyFrame`] wraps the channel of an established frame and turns
//! `execute` calls into correlated request/response exchanges.

use crate::adapters::pending::{PendingRequestTable, ResponseResult};
use crate::domain::correlation::{CorrelationId, FrameId};
use crate::domain::error::{ConnectError, ExecuteError};
use crate::domain::origin::Origin;
use crate::domain::request::{RequestBody, RequestSpec};
use crate::domain::response::ProxyResponse;
use crate::ipc::envelope;
use crate::ipc::messages::{ExecuteCommandRequest, HandshakeAck, ProxyMessage};
use crate::ports::outbound::FrameChannel;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::time::{Instant, Sleep};
use tracing::debug;

/// Established connection to one remote origin.
pub struct ProxyFrame {
    frame_id: FrameId,
    origin: Origin,
    channel: Arc<dyn FrameChannel>,
    pending: Arc<PendingRequestTable>,
    request_timeout: Option<Duration>,
}

impl ProxyFrame {
    pub(crate) fn new(
        frame_id: FrameId,
        origin: Origin,
        channel: Arc<dyn FrameChannel>,
        pending: Arc<PendingRequestTable>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            frame_id,
            origin,
            channel,
            pending,
            request_timeout,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn frame_id(&self) -> &FrameId {
        &self.frame_id
    }

    /// Confirm the handshake to the remote side.
    pub(crate) fn acknowledge(&self) -> Result<(), ConnectError> {
        let (id, wire) = envelope::encode(&ProxyMessage::HandshakeAck(HandshakeAck {}))
            .map_err(|e| ConnectError::Encode(e.to_string()))?;
        self.channel.post_message(&wire, &self.origin)?;
        debug!(frame_id = %self.frame_id, origin = %self.origin, ack_id = %id, "Handshake acknowledged");
        Ok(())
    }

    /// Ask the remote frame to perform `request`.
    ///
    /// The returned handle resolves with the response when its status is
    /// "ok" and fails with [`ExecuteError::Remote`] carrying the response
    /// otherwise. Dropping the handle abandons the request.
    pub fn execute(&self, request: RequestSpec, body: Option<RequestBody>) -> ResponseHandle {
        match self.send(request, body) {
            Ok(handle) => handle,
            Err(error) => ResponseHandle::failed(error),
        }
    }

    fn send(
        &self,
        request: RequestSpec,
        body: Option<RequestBody>,
    ) -> Result<ResponseHandle, ExecuteError> {
        let method = request.method;
        let url = request.url.to_string();
        let message = ProxyMessage::ExecuteRequest(ExecuteCommandRequest {
            method,
            url: url.clone(),
            headers: request.headers,
            data: body.map(RequestBody::into_value),
        });

        let (correlation_id, wire) =
            envelope::encode(&message).map_err(|e| ExecuteError::Encode(e.to_string()))?;

        let rx = self
            .pending
            .register(correlation_id, &self.origin, method, &url)?;

        if let Err(e) = self.channel.post_message(&wire, &self.origin) {
            self.pending.cancel(&correlation_id);
            return Err(ExecuteError::Send(e));
        }

        let deadline = self.request_timeout.map(|timeout| Deadline {
            timeout,
            at: Instant::now() + timeout,
            sleep: None,
        });

        Ok(ResponseHandle {
            state: HandleState::Waiting(Box::new(Waiting {
                correlation_id,
                rx,
                deadline,
                pending: Arc::clone(&self.pending),
            })),
        })
    }
}

impl fmt::Debug for ProxyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFrame")
            .field("frame_id", &self.frame_id)
            .field("origin", &self.origin)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Future of one `execute` call.
pub struct ResponseHandle {
    state: HandleState,
}

enum HandleState {
    Failed(ExecuteError),
    Waiting(Box<Waiting>),
    Done,
}

struct Waiting {
    correlation_id: CorrelationId,
    rx: oneshot::Receiver<ResponseResult>,
    deadline: Option<Deadline>,
    pending: Arc<PendingRequestTable>,
}

struct Deadline {
    timeout: Duration,
    at: Instant,
    // Created on first poll so handles can be built outside a runtime
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ResponseHandle {
    fn failed(error: ExecuteError) -> Self {
        Self {
            state: HandleState::Failed(error),
        }
    }

    /// Correlation id of the request, while it is pending
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        match &self.state {
            HandleState::Waiting(waiting) => Some(&waiting.correlation_id),
            _ => None,
        }
    }
}

impl Waiting {
    fn poll_outcome(&mut self, cx: &mut Context<'_>) -> Poll<ResponseResult> {
        if let Poll::Ready(result) = Pin::new(&mut self.rx).poll(cx) {
            return Poll::Ready(result.unwrap_or(Err(ExecuteError::Cancelled)));
        }

        let Some(deadline) = self.deadline.as_mut() else {
            return Poll::Pending;
        };
        let at = deadline.at;
        let sleep = deadline
            .sleep
            .get_or_insert_with(|| Box::pin(tokio::time::sleep_until(at)));
        if sleep.as_mut().poll(cx).is_pending() {
            return Poll::Pending;
        }

        if self.pending.expire(&self.correlation_id) {
            return Poll::Ready(Err(ExecuteError::TimedOut(deadline.timeout)));
        }

        // A response claimed the entry first; it is delivered or about to be
        match self.rx.try_recv() {
            Ok(result) => Poll::Ready(result),
            Err(TryRecvError::Empty) => Poll::Pending,
            Err(TryRecvError::Closed) => Poll::Ready(Err(ExecuteError::Cancelled)),
        }
    }
}

impl Future for ResponseHandle {
    type Output = Result<ProxyResponse, ExecuteError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match std::mem::replace(&mut this.state, HandleState::Done) {
            HandleState::Failed(error) => Poll::Ready(Err(error)),
            HandleState::Waiting(mut waiting) => match waiting.poll_outcome(cx) {
                Poll::Ready(result) => Poll::Ready(result),
                Poll::Pending => {
                    this.state = HandleState::Waiting(waiting);
                    Poll::Pending
                }
            },
            HandleState::Done => Poll::Ready(Err(ExecuteError::Cancelled)),
        }
    }
}

impl Drop for ResponseHandle {
    fn drop(&mut self) {
        if let HandleState::Waiting(waiting) = &self.state {
            waiting.pending.cancel(&waiting.correlation_id);
        }
    }
}

impl fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            HandleState::Failed(_) => "failed",
            HandleState::Waiting(_) => "waiting",
            HandleState::Done => "done",
        };
        f.debug_struct("ResponseHandle")
            .field("state", &state)
            .field("correlation_id", &self.correlation_id())
            .finish()
    }
}
