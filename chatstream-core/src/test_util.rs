#![cfg(test)]

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::StatusCode;

use crate::error::{ChatStreamError, CoreResult};
use crate::guard::Navigator;
use crate::transport::{RequestOptions, Transport, TransportResponse};

/// Builds a response that replays `chunks` in order.
pub fn scripted_response(status: StatusCode, chunks: Vec<Vec<u8>>) -> TransportResponse {
    let items: Vec<CoreResult<Bytes>> = chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
    TransportResponse {
        status,
        request_id: None,
        body: Box::pin(futures::stream::iter(items)),
    }
}

/// In-memory transport: one fixed status and body, optionally failing after
/// `fail_after` chunks. Records what it was asked to send.
pub struct ScriptedTransport {
    status: StatusCode,
    chunks: Vec<Vec<u8>>,
    fail_after: Option<usize>,
    polled: std::sync::Arc<Mutex<usize>>,
    pub requests: Mutex<Vec<(String, RequestOptions)>>,
}

impl ScriptedTransport {
    pub fn ok(chunks: Vec<Vec<u8>>) -> Self {
        Self::with_status(StatusCode::OK, chunks)
    }

    pub fn with_status(status: StatusCode, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status,
            chunks,
            fail_after: None,
            polled: Default::default(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Whole body delivered as one chunk.
    pub fn body(text: &str) -> Self {
        Self::ok(vec![text.as_bytes().to_vec()])
    }

    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Number of body chunks handed out so far.
    pub fn chunks_read(&self) -> usize {
        *self.polled.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<(String, RequestOptions)> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, url: &str, options: RequestOptions) -> CoreResult<TransportResponse> {
        self.requests.lock().unwrap().push((url.to_string(), options));
        let mut items: Vec<CoreResult<Bytes>> =
            self.chunks.iter().cloned().map(|c| Ok(Bytes::from(c))).collect();
        if let Some(n) = self.fail_after {
            items.truncate(n);
            items.push(Err(ChatStreamError::transport("connection reset")));
        }
        let polled = self.polled.clone();
        let body = futures::stream::iter(items).inspect(move |_| *polled.lock().unwrap() += 1);
        Ok(TransportResponse {
            status: self.status,
            request_id: None,
            body: Box::pin(body),
        })
    }
}

/// Splits `text` into chunks of `size` bytes, ignoring character boundaries.
pub fn split_every(text: &str, size: usize) -> Vec<Vec<u8>> {
    text.as_bytes().chunks(size).map(<[u8]>::to_vec).collect()
}

pub struct RecordingNavigator {
    path: String,
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(path: &str) -> Self {
        Self {
            path: path.to_string(),
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.path.clone()
    }

    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}
