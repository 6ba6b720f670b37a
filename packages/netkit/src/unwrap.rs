//! Layered unwrap chain for interpreting a [`TransportResult`].
//!
//! Each helper applies a prefix of the following layers, in order:
//!
//! 1. a transport error fails with [`ResponseError::TransportFailure`],
//!    whatever else is present;
//! 2. missing metadata fails with [`ResponseError::InvalidMetadata`];
//! 3. (`*_http_*` helpers) non-HTTP metadata fails with
//!    [`ResponseError::InvalidMetadata`] carrying that metadata;
//! 4. (body helpers) a missing body fails with [`ResponseError::MissingBody`];
//! 5. (decode helpers) a decoder error fails with
//!    [`ResponseError::DecodeFailure`] wrapping the decoder's error.
//!
//! Contracts pick the deepest layer they need.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{DecodeError, ResponseError, TransportError};
use crate::types::{HttpMetadata, ResponseMetadata, TransportResult};

impl TransportResult {
    /// Layers 1-2.
    pub fn into_metadata(self) -> Result<ResponseMetadata, ResponseError> {
        unwrap_metadata(self.metadata, self.error)
    }

    /// Layers 1-3.
    pub fn into_http_metadata(self) -> Result<HttpMetadata, ResponseError> {
        require_http(self.into_metadata()?)
    }

    /// Layers 1, 2 and 4.
    pub fn into_body(self) -> Result<(Bytes, ResponseMetadata), ResponseError> {
        let metadata = unwrap_metadata(self.metadata, self.error)?;
        let body = self.body.ok_or(ResponseError::MissingBody)?;
        Ok((body, metadata))
    }

    /// Layers 1-4.
    pub fn into_http_body(self) -> Result<(Bytes, HttpMetadata), ResponseError> {
        let metadata = require_http(unwrap_metadata(self.metadata, self.error)?)?;
        let body = self.body.ok_or(ResponseError::MissingBody)?;
        Ok((body, metadata))
    }

    /// Layers 1, 2, 4 and 5 with an arbitrary decoder.
    pub fn decode_with<T, E, F>(self, decode: F) -> Result<(T, ResponseMetadata), ResponseError>
    where
        F: FnOnce(&[u8]) -> Result<T, E>,
        E: Into<DecodeError>,
    {
        let (body, metadata) = self.into_body()?;
        let value = decode(&body[..]).map_err(|e| ResponseError::DecodeFailure(e.into()))?;
        Ok((value, metadata))
    }

    /// Layers 1-5 with an arbitrary decoder.
    pub fn decode_http_with<T, E, F>(self, decode: F) -> Result<(T, HttpMetadata), ResponseError>
    where
        F: FnOnce(&[u8]) -> Result<T, E>,
        E: Into<DecodeError>,
    {
        let (body, metadata) = self.into_http_body()?;
        let value = decode(&body[..]).map_err(|e| ResponseError::DecodeFailure(e.into()))?;
        Ok((value, metadata))
    }

    /// Layers 1, 2, 4 and 5, decoding the body as JSON.
    pub fn decode_json<T: DeserializeOwned>(self) -> Result<(T, ResponseMetadata), ResponseError> {
        self.decode_with(|bytes| serde_json::from_slice::<T>(bytes))
    }

    /// Layers 1-5, decoding the body as JSON.
    pub fn decode_http_json<T: DeserializeOwned>(self) -> Result<(T, HttpMetadata), ResponseError> {
        self.decode_http_with(|bytes| serde_json::from_slice::<T>(bytes))
    }
}

fn unwrap_metadata(
    metadata: Option<ResponseMetadata>,
    error: Option<TransportError>,
) -> Result<ResponseMetadata, ResponseError> {
    if let Some(error) = error {
        return Err(ResponseError::TransportFailure(error));
    }
    metadata.ok_or(ResponseError::InvalidMetadata(None))
}

fn require_http(metadata: ResponseMetadata) -> Result<HttpMetadata, ResponseError> {
    match metadata {
        ResponseMetadata::Http(http) => Ok(http),
        other => Err(ResponseError::InvalidMetadata(Some(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use url::Url;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    fn http_metadata() -> ResponseMetadata {
        HttpMetadata::new(Url::parse("https://api.example.com/items").unwrap(), 200).into()
    }

    fn other_metadata() -> ResponseMetadata {
        ResponseMetadata::Other { url: None }
    }

    #[test]
    fn transport_error_wins_over_everything() {
        let result = TransportResult::new(
            Some(Bytes::from_static(br#"{"id": 1}"#)),
            Some(http_metadata()),
            Some(TransportError::Timeout),
        );

        assert!(matches!(
            result.clone().into_metadata(),
            Err(ResponseError::TransportFailure(TransportError::Timeout))
        ));
        assert!(matches!(
            result.clone().into_http_body(),
            Err(ResponseError::TransportFailure(TransportError::Timeout))
        ));
        assert!(matches!(
            result.decode_http_json::<Item>(),
            Err(ResponseError::TransportFailure(TransportError::Timeout))
        ));
    }

    #[test]
    fn missing_metadata_is_invalid() {
        let result = TransportResult::new(Some(Bytes::from_static(b"{}")), None, None);
        assert!(matches!(
            result.clone().into_metadata(),
            Err(ResponseError::InvalidMetadata(None))
        ));
        assert!(matches!(
            result.decode_json::<Item>(),
            Err(ResponseError::InvalidMetadata(None))
        ));
    }

    #[test]
    fn non_http_metadata_rejected_by_http_layer() {
        let result = TransportResult::new(None, Some(other_metadata()), None);

        // Accepted by the generic layer.
        assert_eq!(result.clone().into_metadata().unwrap(), other_metadata());

        match result.into_http_metadata() {
            Err(ResponseError::InvalidMetadata(Some(metadata))) => {
                assert_eq!(metadata, other_metadata());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn metadata_kind_checked_before_body() {
        let result = TransportResult::new(None, Some(other_metadata()), None);
        assert!(matches!(
            result.into_http_body(),
            Err(ResponseError::InvalidMetadata(Some(_)))
        ));
    }

    #[test]
    fn missing_body() {
        let result = TransportResult::new(None, Some(http_metadata()), None);
        assert!(matches!(
            result.clone().into_body(),
            Err(ResponseError::MissingBody)
        ));
        assert!(matches!(
            result.decode_http_json::<Item>(),
            Err(ResponseError::MissingBody)
        ));
    }

    #[test]
    fn decode_failure_wraps_decoder_error() {
        let result = TransportResult::response(
            http_metadata().as_http().cloned().unwrap(),
            "definitely not json",
        );

        match result.decode_http_json::<Item>() {
            Err(ResponseError::DecodeFailure(error)) => {
                assert!(error.downcast_ref::<serde_json::Error>().is_some());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn decodes_json() {
        let result = TransportResult::new(
            Some(Bytes::from_static(br#"{"id": 7}"#)),
            Some(http_metadata()),
            None,
        );
        let (item, metadata) = result.decode_http_json::<Item>().unwrap();
        assert_eq!(item, Item { id: 7 });
        assert_eq!(metadata.status, 200);
    }

    #[test]
    fn custom_decoder() {
        let result = TransportResult::new(
            Some(Bytes::from_static(b"42")),
            Some(other_metadata()),
            None,
        );
        let (value, _) = result
            .decode_with(|bytes| {
                std::str::from_utf8(bytes)
                    .map_err(DecodeError::new)?
                    .parse::<u32>()
                    .map_err(DecodeError::new)
            })
            .unwrap();
        assert_eq!(value, 42);
    }
}
