//! Typed request/response contracts.
//!
//! A [`NetworkRequest`] describes one logical operation and knows how to
//! shape itself into a [`WireRequest`]. Its paired [`NetworkResponse`]
//! interprets whatever the transport produced for an attempt. The pairing
//! is one-to-one and checked at compile time: `R::Response::Request == R`.
//!
//! ```ignore
//! struct ListItems;
//!
//! struct Items {
//!     items: Vec<Item>,
//! }
//!
//! impl NetworkRequest for ListItems {
//!     type Response = Items;
//!
//!     fn wire_request(&self, base_url: &Url) -> Result<WireRequest, RequestBuildError> {
//!         Ok(WireRequest::get(join_url(base_url, "/items")?))
//!     }
//! }
//!
//! impl NetworkResponse for Items {
//!     type Request = ListItems;
//!     type Value = Vec<Item>;
//!
//!     fn value(&self) -> &Vec<Item> {
//!         &self.items
//!     }
//!
//!     fn into_value(self) -> Vec<Item> {
//!         self.items
//!     }
//!
//!     fn interpret(_: &ListItems, result: TransportResult) -> Result<Self, ResponseError> {
//!         let (items, _) = result.decode_http_json()?;
//!         Ok(Items { items })
//!     }
//! }
//! ```

use url::Url;

use crate::error::{RequestBuildError, ResponseError};
use crate::types::{TransportResult, WireRequest};

/// A typed description of one logical request.
///
/// Implementations are immutable values; the session keeps one alive for
/// the whole lifetime of the logical request, including every retry.
pub trait NetworkRequest: Send + Sync + 'static {
    type Response: NetworkResponse<Request = Self>;

    /// Shape this request into a wire request relative to `base_url`.
    ///
    /// Must be a pure function of `self` and `base_url`.
    fn wire_request(&self, base_url: &Url) -> Result<WireRequest, RequestBuildError>;
}

/// A typed interpretation of a transport result.
///
/// The designated [`Value`](NetworkResponse::Value) is the part exposed to
/// callers that only care about the payload, e.g. through
/// [`Session::submit_with`](crate::Session::submit_with).
pub trait NetworkResponse: Sized + Send + Sync + 'static {
    type Request;
    type Value;

    fn value(&self) -> &Self::Value;

    fn into_value(self) -> Self::Value;

    /// Build a response from one attempt's transport result.
    ///
    /// The layered helpers on [`TransportResult`] cover the common
    /// unwrap steps; see the [`unwrap`](crate::unwrap) module.
    fn interpret(request: &Self::Request, result: TransportResult) -> Result<Self, ResponseError>;
}
