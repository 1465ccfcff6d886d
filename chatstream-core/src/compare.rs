//! Decoding several streams side by side.

use futures::future::join_all;
use serde::Serialize;

use crate::decoder::EventStreamDecoder;
use crate::handler::EventLog;
use crate::stream::{StreamEvent, StreamOutcome, Usage};
use crate::transport::RequestOptions;

#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub label: String,
    pub url: String,
    pub options: RequestOptions,
}

impl StreamRequest {
    pub fn new(label: impl Into<String>, url: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            options,
        }
    }
}

/// What one stream produced. `outcome` is `None` when the exchange failed
/// outright; `error` then carries the transport error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamSummary {
    pub label: String,
    pub outcome: Option<StreamOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    pub full_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub chunks: usize,
}

impl StreamSummary {
    fn from_log(label: String, outcome: Option<StreamOutcome>, log: &EventLog) -> Self {
        let mut summary = Self {
            label,
            outcome,
            stream_id: None,
            full_text: log.text(),
            usage: None,
            error: None,
            chunks: log.events.iter().filter(|e| e.as_text_delta().is_some()).count(),
        };
        for event in &log.events {
            match event {
                StreamEvent::Start { stream_id } | StreamEvent::Chunk { stream_id, .. } => {
                    summary.stream_id.get_or_insert_with(|| stream_id.clone());
                }
                StreamEvent::Done {
                    full_text,
                    stream_id,
                    usage,
                } => {
                    summary.full_text = full_text.clone();
                    if summary.stream_id.is_none() {
                        summary.stream_id = stream_id.clone();
                    }
                    summary.usage = usage.clone();
                }
                StreamEvent::Error { message, .. } => summary.error = Some(message.clone()),
                _ => {}
            }
        }
        summary
    }
}

/// Decodes every request concurrently on the current task. Results come back
/// in request order; one failing stream never affects the others.
pub async fn decode_all(decoder: &EventStreamDecoder, requests: Vec<StreamRequest>) -> Vec<StreamSummary> {
    let runs = requests.into_iter().map(|req| async move {
        let mut log = EventLog::new();
        match decoder.decode(&req.url, req.options, &mut log).await {
            Ok(outcome) => StreamSummary::from_log(req.label, Some(outcome), &log),
            Err(e) => {
                let mut summary = StreamSummary::from_log(req.label, None, &log);
                summary.error = Some(e.to_string());
                summary
            }
        }
    });
    join_all(runs).await
}
