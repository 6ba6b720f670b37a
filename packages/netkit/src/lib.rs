//! # netkit
//!
//! Typed, asynchronous HTTP client core.
//!
//! A request type implements [`NetworkRequest`] and names its paired
//! [`NetworkResponse`]. A [`Session`] runs submitted requests on serial
//! queues, performs them through a [`Transport`], interprets the results
//! and consults its [`SessionDelegate`] about retries.
//!
//! ## Submitting a request
//!
//! ```ignore
//! use netkit::{ReqwestTransport, Session};
//!
//! let transport = ReqwestTransport::with_default_config()?;
//! let session = Session::new("https://api.example.com", transport)?;
//!
//! // Await the typed response...
//! let items = session.submit(ListItems).await?;
//!
//! // ...or only get called back with its value.
//! session.submit_with(ListItems, |items| println!("{items:?}"));
//! ```
//!
//! ## Serial queues and retries
//!
//! ```ignore
//! struct Policy;
//!
//! #[async_trait]
//! impl SessionDelegate for Policy {
//!     fn queue_key<R: NetworkRequest>(&self, _request: &R) -> Option<String> {
//!         Some("items-queue".to_string())
//!     }
//!
//!     async fn should_retry<R: NetworkRequest>(
//!         &self,
//!         _request: &R,
//!         failures: &[FailedAttempt],
//!     ) -> bool {
//!         failures.len() < 3
//!     }
//! }
//!
//! let session = Session::with_delegate("https://api.example.com", transport, Policy)?;
//! ```
//!
//! Requests with the same queue key run strictly one at a time in
//! submission order, retries included. Requests without a key share the
//! default queue, which is serial too.

pub mod contract;
pub mod delegate;
pub mod error;
pub mod promise;
pub mod queue;
pub mod session;
pub mod transport;
pub mod types;
pub mod unwrap;

pub use async_trait::async_trait;
pub use contract::{NetworkRequest, NetworkResponse};
pub use delegate::{DefaultDelegate, MaxAttempts, SessionDelegate};
pub use error::{
    BrokenPromise, ConfigError, DecodeError, RequestBuildError, ResponseError, SessionError,
    TransportError,
};
pub use promise::{Promise, PromiseFuture};
pub use queue::{QueueRegistry, SerialQueue};
pub use session::{ResponseFuture, Session};
pub use transport::{transport_fn, FnTransport, Transport, TransportConfig};
pub use types::{
    join_url, FailedAttempt, HttpMetadata, Method, ResponseMetadata, TransportResult, WireRequest,
};

#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
