use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::Serialize;

use crate::error::{ChatStreamError, CoreResult};

/// Response body as raw chunks, in whatever sizes the network delivers.
pub type ByteStream =
    Pin<Box<dyn futures_util::stream::Stream<Item = CoreResult<Bytes>> + Send>>;

/// Passthrough request settings. The decoder adds `Accept` and, when a
/// credential is available, `Authorization`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    /// POST with a JSON-encoded body.
    pub fn post_json<T: Serialize + ?Sized>(body: &T) -> CoreResult<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ChatStreamError::Validation(format!("request body not serializable: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(Self {
            method: Method::POST,
            headers,
            body: Some(Bytes::from(bytes)),
        })
    }

    /// Adds a header, replacing any previous value.
    pub fn header(mut self, name: &str, value: &str) -> CoreResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ChatStreamError::Validation(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ChatStreamError::Validation(format!("invalid value for header '{name}': {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

pub struct TransportResponse {
    pub status: StatusCode,
    /// Correlation id returned by the server, if any.
    pub request_id: Option<String>,
    pub body: ByteStream,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// Byte-producing side of a stream. Errors mean the exchange itself failed
/// (connection refused, reset mid-body), never an HTTP status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, options: RequestOptions) -> CoreResult<TransportResponse>;
}
