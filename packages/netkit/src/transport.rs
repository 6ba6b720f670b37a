//! Transport abstraction.
//!
//! The session never performs I/O itself; it hands each [`WireRequest`] to
//! a [`Transport`] and interprets whatever comes back. Tests plug in a mock,
//! production code uses [`ReqwestTransport`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::types::{TransportResult, WireRequest};

/// Performs one wire request and reports what happened.
///
/// Exactly one result per call. Failures are reported inside the
/// [`TransportResult`], never by panicking.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: WireRequest) -> TransportResult;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn perform(&self, request: WireRequest) -> TransportResult {
        (**self).perform(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn perform(&self, request: WireRequest) -> TransportResult {
        (**self).perform(request).await
    }
}

/// A transport backed by an async function.
pub struct FnTransport<F>(F);

/// Wrap an async function as a [`Transport`].
pub fn transport_fn<F, Fut>(perform: F) -> FnTransport<F>
where
    F: Fn(WireRequest) -> Fut + Send + Sync,
    Fut: Future<Output = TransportResult> + Send,
{
    FnTransport(perform)
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(WireRequest) -> Fut + Send + Sync,
    Fut: Future<Output = TransportResult> + Send,
{
    async fn perform(&self, request: WireRequest) -> TransportResult {
        (self.0)(request).await
    }
}

/// Settings for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Headers sent with every request unless the request overrides them.
    pub default_headers: HashMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("netkit/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
    use reqwest::Client;

    use super::{Transport, TransportConfig};
    use crate::error::{ConfigError, TransportError};
    use crate::types::{HttpMetadata, TransportResult, WireRequest};

    /// Production transport using an async reqwest client.
    ///
    /// Non-2xx statuses are not transport errors; they are returned as
    /// metadata for the response contract to judge.
    pub struct ReqwestTransport {
        client: Client,
        config: TransportConfig,
    }

    impl ReqwestTransport {
        pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
            let mut headers = HeaderMap::new();
            for (name, value) in &config.default_headers {
                let header_name =
                    HeaderName::try_from(name.as_str()).map_err(|e| ConfigError::InvalidHeader {
                        name: name.clone(),
                        message: e.to_string(),
                    })?;
                let header_value =
                    HeaderValue::try_from(value.as_str()).map_err(|e| ConfigError::InvalidHeader {
                        name: name.clone(),
                        message: e.to_string(),
                    })?;
                headers.insert(header_name, header_value);
            }

            let client = Client::builder()
                .timeout(config.timeout)
                .connect_timeout(config.connect_timeout)
                .user_agent(config.user_agent.as_str())
                .default_headers(headers)
                .build()
                .map_err(|e| ConfigError::Client {
                    message: e.to_string(),
                })?;

            Ok(Self { client, config })
        }

        pub fn with_default_config() -> Result<Self, ConfigError> {
            Self::new(TransportConfig::default())
        }

        pub fn config(&self) -> &TransportConfig {
            &self.config
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn perform(&self, request: WireRequest) -> TransportResult {
            let method: reqwest::Method = request.method.into();
            let mut builder = self.client.request(method, request.url);

            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => return TransportResult::failure(TransportError::from(e)),
            };

            let mut metadata = HttpMetadata::new(response.url().clone(), response.status().as_u16());
            for (name, value) in response.headers() {
                if let Ok(v) = value.to_str() {
                    metadata = metadata.with_header(name.as_str(), v);
                }
            }

            // Metadata survives a failed body read so contracts can still
            // inspect the status line.
            match response.bytes().await {
                Ok(body) => TransportResult::new(Some(body), Some(metadata.into()), None),
                Err(e) => TransportResult::new(None, Some(metadata.into()), Some(e.into())),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;
    use crate::types::Method;
    use url::Url;

    fn request(path: &str) -> WireRequest {
        WireRequest::get(Url::parse("https://api.example.com").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn mock_transport_follows_script_then_fallback() {
        let transport = MockTransport::new()
            .then(MockTransport::network_error())
            .otherwise(MockTransport::ok_json(
                "https://api.example.com/items",
                serde_json::json!({"ok": true}),
            ));

        let first = transport.perform(request("/items")).await;
        assert!(first.error.is_some());

        let second = transport.perform(request("/items")).await;
        assert!(second.error.is_none());
        assert!(second.body.is_some());

        let third = transport.perform(request("/items")).await;
        assert!(third.error.is_none());

        assert_eq!(transport.calls(), 3);
        assert_eq!(transport.recorded_requests()[0].method, Method::GET);
        assert_eq!(transport.max_in_flight("/items"), 1);
    }

    #[tokio::test]
    async fn mock_transport_without_script_fails() {
        let transport = MockTransport::new();
        let result = transport.perform(request("/anything")).await;
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn fn_transport_forwards_requests() {
        let transport = transport_fn(|request: WireRequest| async move {
            assert_eq!(request.url.path(), "/echo");
            TransportResult::failure(crate::error::TransportError::Timeout)
        });

        let result = transport.perform(request("/echo")).await;
        assert_eq!(result.error, Some(crate::error::TransportError::Timeout));
    }

    #[tokio::test]
    async fn shared_transport_is_a_transport() {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new().otherwise(
            MockTransport::ok_json("https://api.example.com/", serde_json::json!(null)),
        ));
        let result = transport.perform(request("/")).await;
        assert!(result.metadata.is_some());
    }

    #[test]
    fn default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("netkit/"));
        assert!(config.default_headers.is_empty());
    }

    #[test]
    fn config_builders() {
        let config = TransportConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(1))
            .with_user_agent("test-agent")
            .with_default_header("x-api-key", "secret");

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(
            config.default_headers.get("x-api-key"),
            Some(&"secret".to_string())
        );
    }

    #[cfg(feature = "reqwest")]
    #[test]
    fn reqwest_transport_creation() {
        let transport = ReqwestTransport::with_default_config();
        assert!(transport.is_ok());
    }

    #[cfg(feature = "reqwest")]
    #[test]
    fn reqwest_transport_rejects_bad_header() {
        let config = TransportConfig::default().with_default_header("bad header", "value");
        let result = ReqwestTransport::new(config);
        assert!(matches!(
            result,
            Err(crate::error::ConfigError::InvalidHeader { .. })
        ));
    }
}
