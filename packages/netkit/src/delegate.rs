//! Decision points the session consults while running a request.
//!
//! All three hooks are generic over the request type. A delegate that
//! needs request-specific behavior can downcast through [`std::any::Any`]
//! since every [`NetworkRequest`] is `'static`.

use async_trait::async_trait;
use url::Url;

use crate::contract::NetworkRequest;
use crate::types::{FailedAttempt, WireRequest};

/// Queue selection, wire request shaping and retry policy for a session.
///
/// Every method has a default: all requests share the default queue, wire
/// requests come straight from [`NetworkRequest::wire_request`] (a build
/// error cancels the request), and failures are never retried.
#[async_trait]
pub trait SessionDelegate: Send + Sync + 'static {
    /// Key of the serial queue `request` must run on. `None` selects the
    /// session's default queue.
    fn queue_key<R: NetworkRequest>(&self, _request: &R) -> Option<String> {
        None
    }

    /// Produce the wire request for the next attempt. `None` cancels the
    /// logical request.
    async fn wire_request<R: NetworkRequest>(
        &self,
        request: &R,
        base_url: &Url,
    ) -> Option<WireRequest> {
        match request.wire_request(base_url) {
            Ok(wire_request) => Some(wire_request),
            Err(error) => {
                tracing::debug!(%error, "request could not be shaped");
                None
            }
        }
    }

    /// Decide whether to attempt `request` again.
    ///
    /// `failures` holds every failed attempt so far, oldest first; the last
    /// entry is the attempt that just failed.
    async fn should_retry<R: NetworkRequest>(
        &self,
        _request: &R,
        _failures: &[FailedAttempt],
    ) -> bool {
        false
    }
}

/// Delegate with every default behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDelegate;

impl SessionDelegate for DefaultDelegate {}

/// Retries any failure until `max_attempts` attempts have been made.
#[derive(Debug, Clone, Copy)]
pub struct MaxAttempts {
    pub max_attempts: usize,
}

impl MaxAttempts {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }
}

#[async_trait]
impl SessionDelegate for MaxAttempts {
    async fn should_retry<R: NetworkRequest>(
        &self,
        _request: &R,
        failures: &[FailedAttempt],
    ) -> bool {
        failures.len() < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::NetworkResponse;
    use crate::error::{RequestBuildError, ResponseError};
    use crate::types::{join_url, TransportResult};

    struct Ping {
        path: &'static str,
    }

    struct Pong;

    impl NetworkRequest for Ping {
        type Response = Pong;

        fn wire_request(&self, base_url: &Url) -> Result<WireRequest, RequestBuildError> {
            if self.path.is_empty() {
                return Err(RequestBuildError::invalid_parameters("empty path"));
            }
            Ok(WireRequest::get(join_url(base_url, self.path)?))
        }
    }

    impl NetworkResponse for Pong {
        type Request = Ping;
        type Value = ();

        fn value(&self) -> &() {
            &()
        }

        fn into_value(self) {}

        fn interpret(_: &Ping, result: TransportResult) -> Result<Self, ResponseError> {
            result.into_metadata().map(|_| Pong)
        }
    }

    fn base() -> Url {
        Url::parse("https://api.example.com").unwrap()
    }

    fn failure() -> FailedAttempt {
        FailedAttempt {
            error: ResponseError::UnspecifiedFailure,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn default_delegate_forwards_wire_request() {
        let delegate = DefaultDelegate;
        let request = Ping { path: "/ping" };

        assert_eq!(delegate.queue_key(&request), None);

        let wire = delegate.wire_request(&request, &base()).await.unwrap();
        assert_eq!(wire.url.as_str(), "https://api.example.com/ping");
    }

    #[tokio::test]
    async fn default_delegate_cancels_on_build_error() {
        let delegate = DefaultDelegate;
        let request = Ping { path: "" };

        assert!(delegate.wire_request(&request, &base()).await.is_none());
    }

    #[tokio::test]
    async fn default_delegate_never_retries() {
        let delegate = DefaultDelegate;
        assert!(!delegate.should_retry(&Ping { path: "/" }, &[failure()]).await);
    }

    #[tokio::test]
    async fn max_attempts_counts_failures() {
        let delegate = MaxAttempts::new(3);
        let request = Ping { path: "/" };

        assert!(delegate.should_retry(&request, &[failure()]).await);
        assert!(delegate.should_retry(&request, &[failure(), failure()]).await);
        assert!(
            !delegate
                .should_retry(&request, &[failure(), failure(), failure()])
                .await
        );
    }
}
