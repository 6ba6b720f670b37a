//! The request dispatcher.
//!
//! A [`Session`] owns a base URL, a transport, a delegate and a registry of
//! serial queues. Submitting a request:
//!
//! 1. hands it to the session's dispatch queue, which asks the delegate for
//!    a queue key and looks up (or creates) that queue;
//! 2. schedules the attempt loop as one job on that queue;
//! 3. the loop asks the delegate for a wire request (`None` cancels),
//!    performs it, and interprets the result with the response contract;
//! 4. on failure the attempt is added to the request's history and the
//!    delegate decides whether to go around again.
//!
//! The queue slot is held until the loop terminates, so retries of one
//! request never overlap with other requests on the same key.
//!
//! Delegate calls go through a session-wide coordinator lock: the delegate
//! is never entered by two requests at once, whatever their queues. The
//! lock is not held while the transport runs.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Mutex;
use url::Url;

use crate::contract::{NetworkRequest, NetworkResponse};
use crate::delegate::{DefaultDelegate, SessionDelegate};
use crate::error::{ConfigError, SessionError};
use crate::promise::{self, PromiseFuture};
use crate::queue::{QueueRegistry, SerialQueue};
use crate::transport::Transport;
use crate::types::{FailedAttempt, WireRequest};

/// Future returned by [`Session::submit`].
pub type ResponseFuture<R> = PromiseFuture<R, SessionError>;

struct Inner<D> {
    base_url: Url,
    transport: Arc<dyn Transport>,
    delegate: Arc<D>,
    /// Serializes every delegate call.
    coordinator: Mutex<()>,
    /// Picks queues for submitted requests, in submission order.
    dispatch: SerialQueue,
    queues: QueueRegistry,
}

/// Typed HTTP session.
///
/// Cheap to clone; clones share queues, transport and delegate.
///
/// # Example
///
/// ```ignore
/// use netkit::{ReqwestTransport, Session};
///
/// let session = Session::new("https://api.example.com", ReqwestTransport::with_default_config()?)?;
///
/// let items = session.submit(ListItems).await?;
/// println!("{:?}", items.value());
/// ```
pub struct Session<D = DefaultDelegate> {
    inner: Arc<Inner<D>>,
}

impl<D> Clone for Session<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Session<DefaultDelegate> {
    /// Create a session with default delegate behavior on the current
    /// tokio runtime.
    pub fn new(base_url: &str, transport: impl Transport + 'static) -> Result<Self, ConfigError> {
        Self::with_delegate(base_url, transport, DefaultDelegate)
    }
}

impl<D: SessionDelegate> Session<D> {
    /// Create a session on the current tokio runtime.
    pub fn with_delegate(
        base_url: &str,
        transport: impl Transport + 'static,
        delegate: D,
    ) -> Result<Self, ConfigError> {
        Self::with_runtime(base_url, transport, delegate, Handle::try_current()?)
    }

    /// Create a session whose queues run on `runtime`.
    pub fn with_runtime(
        base_url: &str,
        transport: impl Transport + 'static,
        delegate: D,
        runtime: Handle,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)?;

        Ok(Self {
            inner: Arc::new(Inner {
                base_url,
                transport: Arc::new(transport),
                delegate: Arc::new(delegate),
                coordinator: Mutex::new(()),
                dispatch: SerialQueue::spawn(None, &runtime),
                queues: QueueRegistry::new(runtime),
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn delegate(&self) -> &D {
        &self.inner.delegate
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn queues(&self) -> &QueueRegistry {
        &self.inner.queues
    }

    /// Schedule `request` and return a future for its typed response.
    ///
    /// The future resolves exactly once: with the response, with
    /// [`SessionError::Cancelled`] if the delegate declined to build a wire
    /// request, or with the last attempt's error once the delegate stops
    /// retrying.
    pub fn submit<R: NetworkRequest>(&self, request: R) -> ResponseFuture<R::Response> {
        let (promise, future) = promise::pending();
        let inner = self.inner.clone();

        // A dropped job fails the future with a broken promise.
        let scheduled = self.inner.dispatch.enqueue(Box::pin(async move {
            let key = inner.queue_key(&request).await;
            let queue = inner.queues.queue_for(key.as_deref());
            tracing::debug!(queue = key.as_deref().unwrap_or("default"), "submitting request");

            let runner = inner.clone();
            let scheduled = queue.enqueue(Box::pin(async move {
                let outcome = runner.run_attempts(&request).await;
                promise.resolve(outcome);
            }));
            if !scheduled {
                tracing::debug!(queue = ?queue.name(), "queue is closed, request dropped");
            }
        }));

        if !scheduled {
            tracing::debug!("dispatch queue is closed, request dropped");
        }

        future
    }

    /// Like [`submit`](Session::submit), also calling `completion` with
    /// just the response's value.
    pub fn submit_with<R, F>(&self, request: R, completion: F) -> ResponseFuture<R::Response>
    where
        R: NetworkRequest,
        F: FnOnce(Result<<R::Response as NetworkResponse>::Value, SessionError>) + Send + 'static,
        <R::Response as NetworkResponse>::Value: Clone + Send + Sync + 'static,
    {
        let future = self.submit(request);
        future
            .map_value(|response| response.value().clone())
            .on_completion(move |outcome| completion(outcome.clone()));
        future
    }
}

impl<D: SessionDelegate> Inner<D> {
    async fn queue_key<R: NetworkRequest>(&self, request: &R) -> Option<String> {
        let _turn = self.coordinator.lock().await;
        self.delegate.queue_key(request)
    }

    async fn wire_request<R: NetworkRequest>(&self, request: &R) -> Option<WireRequest> {
        let _turn = self.coordinator.lock().await;
        self.delegate.wire_request(request, &self.base_url).await
    }

    async fn should_retry<R: NetworkRequest>(
        &self,
        request: &R,
        failures: &[FailedAttempt],
    ) -> bool {
        let _turn = self.coordinator.lock().await;
        self.delegate.should_retry(request, failures).await
    }

    async fn run_attempts<R: NetworkRequest>(
        &self,
        request: &R,
    ) -> Result<R::Response, SessionError> {
        let mut failures: Vec<FailedAttempt> = Vec::new();

        loop {
            let attempt = failures.len() + 1;

            let Some(wire_request) = self.wire_request(request).await else {
                tracing::debug!(attempt, "request cancelled");
                return Err(SessionError::Cancelled);
            };

            tracing::trace!(
                attempt,
                method = ?wire_request.method,
                url = %wire_request.url,
                "performing request"
            );
            let result = self.transport.perform(wire_request).await;
            let metadata = result.metadata.clone();

            let error = match <R::Response as NetworkResponse>::interpret(request, result) {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            failures.push(FailedAttempt {
                error: error.clone(),
                metadata,
            });

            if !self.should_retry(request, &failures).await {
                tracing::debug!(attempt, %error, "request failed");
                return Err(SessionError::Response(error));
            }
            tracing::debug!(attempt, %error, "retrying request");
        }
    }
}
