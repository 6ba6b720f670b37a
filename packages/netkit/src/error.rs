//! Error taxonomy for request shaping, transport, response decoding and
//! the session itself.

use std::fmt;
use std::sync::Arc;

use crate::types::ResponseMetadata;

/// A typed request could not be turned into a wire request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestBuildError {
    #[error("invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("invalid parameters: {message}")]
    InvalidParameters { message: String },
}

impl RequestBuildError {
    pub fn invalid_url(message: impl Into<String>) -> Self {
        RequestBuildError::InvalidUrl {
            message: message.into(),
        }
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        RequestBuildError::InvalidParameters {
            message: message.into(),
        }
    }
}

impl From<url::ParseError> for RequestBuildError {
    fn from(error: url::ParseError) -> Self {
        RequestBuildError::invalid_url(error.to_string())
    }
}

/// Failure reported by a transport for a single attempt.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {message}")]
    Connect { message: String },

    #[error("HTTP error: {message}")]
    Http { message: String },

    #[error("{message}")]
    Other { message: String },
}

impl TransportError {
    pub fn other(message: impl Into<String>) -> Self {
        TransportError::Other {
            message: message.into(),
        }
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect {
                message: error.to_string(),
            }
        } else {
            TransportError::Http {
                message: error.to_string(),
            }
        }
    }
}

/// Shared handle to the error a payload decoder produced.
///
/// Cloning is cheap; the original error stays reachable through
/// [`std::error::Error::source`] and [`DecodeError::inner`].
#[derive(Clone)]
pub struct DecodeError(Arc<dyn std::error::Error + Send + Sync>);

impl DecodeError {
    pub fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(error))
    }

    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }

    /// Downcast the wrapped error to its concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.0)
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(error: serde_json::Error) -> Self {
        DecodeError::new(error)
    }
}

/// A transport result could not be interpreted as a typed response.
///
/// Every variant is routed through the session's retry policy before it
/// becomes terminal.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ResponseError {
    #[error("transport failure: {0}")]
    TransportFailure(#[source] TransportError),

    #[error("invalid response metadata: {0:?}")]
    InvalidMetadata(Option<ResponseMetadata>),

    #[error("response body is missing")]
    MissingBody,

    #[error("failed to decode response body: {0}")]
    DecodeFailure(#[source] DecodeError),

    #[error("unexpected response")]
    UnexpectedResponse,

    #[error("unspecified failure")]
    UnspecifiedFailure,
}

impl ResponseError {
    pub fn decode(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        ResponseError::DecodeFailure(DecodeError::new(error))
    }
}

/// The promise side of a future was dropped before it was resolved.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("promise dropped without being resolved")]
pub struct BrokenPromise;

/// Terminal failure of a logical request, as observed on its future.
#[derive(thiserror::Error, Debug, Clone)]
pub enum SessionError {
    /// The wire builder declined to produce a request.
    #[error("request cancelled")]
    Cancelled,

    /// The last attempt's response error once the retry policy gave up.
    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    BrokenPromise(#[from] BrokenPromise),
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }

    pub fn response_error(&self) -> Option<&ResponseError> {
        match self {
            SessionError::Response(error) => Some(error),
            _ => None,
        }
    }
}

/// Errors constructing a session or transport.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("failed to build HTTP client: {message}")]
    Client { message: String },
}
