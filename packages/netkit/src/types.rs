use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;
use url::Url;

use crate::error::{RequestBuildError, ResponseError, TransportError};

/// HTTP method for requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::POST => http::Method::POST,
            Method::PUT => http::Method::PUT,
            Method::DELETE => http::Method::DELETE,
            Method::PATCH => http::Method::PATCH,
            Method::HEAD => http::Method::HEAD,
            Method::OPTIONS => http::Method::OPTIONS,
        }
    }
}

impl TryFrom<http::Method> for Method {
    type Error = RequestBuildError;

    fn try_from(method: http::Method) -> Result<Self, Self::Error> {
        match method {
            http::Method::GET => Ok(Method::GET),
            http::Method::POST => Ok(Method::POST),
            http::Method::PUT => Ok(Method::PUT),
            http::Method::DELETE => Ok(Method::DELETE),
            http::Method::PATCH => Ok(Method::PATCH),
            http::Method::HEAD => Ok(Method::HEAD),
            http::Method::OPTIONS => Ok(Method::OPTIONS),
            other => Err(RequestBuildError::invalid_parameters(format!(
                "unsupported HTTP method: {}",
                other
            ))),
        }
    }
}

/// Join a relative path onto a base URL.
///
/// A leading `/` in `path` is treated as relative to the base URL's own
/// path, so `https://api.example.com/v1` joined with `/items` yields
/// `https://api.example.com/v1/items`.
pub fn join_url(base: &Url, path: &str) -> Result<Url, RequestBuildError> {
    if base.cannot_be_a_base() {
        return Err(RequestBuildError::invalid_url(format!(
            "{} cannot be used as a base URL",
            base
        )));
    }

    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }

    Ok(base.join(path.trim_start_matches('/'))?)
}

/// A fully-formed, transport-ready request.
///
/// Built by a [`NetworkRequest`](crate::NetworkRequest) from the session's
/// base URL. The session never looks inside it; it is handed to the
/// [`Transport`](crate::Transport) as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl WireRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn patch(url: Url) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as JSON and set the matching content type.
    pub fn with_json_body(self, body: &impl Serialize) -> Result<Self, RequestBuildError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| RequestBuildError::invalid_parameters(e.to_string()))?;
        Ok(self
            .with_header("content-type", "application/json")
            .with_body(bytes))
    }
}

/// Status line and headers of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMetadata {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Status text (e.g., "OK", "Not Found")
    pub status_text: String,

    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
}

impl HttpMetadata {
    pub fn new(url: Url, status: u16) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();

        Self {
            url,
            status,
            status_text,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Check if the response status indicates success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with [`ResponseError::UnexpectedResponse`] unless the status is 2xx.
    pub fn require_success(self) -> Result<Self, ResponseError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ResponseError::UnexpectedResponse)
        }
    }
}

/// Metadata a transport attaches to a response.
///
/// Contracts that only care that *some* response arrived accept any kind;
/// contracts that need a status code require [`ResponseMetadata::Http`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMetadata {
    Http(HttpMetadata),
    Other { url: Option<Url> },
}

impl ResponseMetadata {
    pub fn url(&self) -> Option<&Url> {
        match self {
            ResponseMetadata::Http(http) => Some(&http.url),
            ResponseMetadata::Other { url } => url.as_ref(),
        }
    }

    pub fn as_http(&self) -> Option<&HttpMetadata> {
        match self {
            ResponseMetadata::Http(http) => Some(http),
            ResponseMetadata::Other { .. } => None,
        }
    }
}

impl From<HttpMetadata> for ResponseMetadata {
    fn from(metadata: HttpMetadata) -> Self {
        ResponseMetadata::Http(metadata)
    }
}

/// Everything a transport produced for one attempt.
///
/// Any combination of fields may be present; interpreting them is the
/// response contract's job.
#[derive(Debug, Clone, Default)]
pub struct TransportResult {
    pub body: Option<Bytes>,
    pub metadata: Option<ResponseMetadata>,
    pub error: Option<TransportError>,
}

impl TransportResult {
    pub fn new(
        body: Option<Bytes>,
        metadata: Option<ResponseMetadata>,
        error: Option<TransportError>,
    ) -> Self {
        Self {
            body,
            metadata,
            error,
        }
    }

    /// A completed response with a body.
    pub fn response(metadata: impl Into<ResponseMetadata>, body: impl Into<Bytes>) -> Self {
        Self::new(Some(body.into()), Some(metadata.into()), None)
    }

    /// A failed attempt with no response at all.
    pub fn failure(error: TransportError) -> Self {
        Self::new(None, None, Some(error))
    }
}

/// One failed attempt of a logical request.
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub error: ResponseError,
    pub metadata: Option<ResponseMetadata>,
}
