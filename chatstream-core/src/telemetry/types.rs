use serde::{Deserialize, Serialize};

use super::keys::*;
use crate::stream::{StreamOutcome, Usage};

/// One record per decode call, emitted when the call returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreamTrace {
    pub url: Option<String>,

    /// Identifier captured from the first identifying frame.
    pub stream_id: Option<String>,

    /// Server's returned request id/correlation id.
    pub request_id: Option<String>,

    /// `StreamOutcome::as_str`, or "transport_error" when `decode` failed.
    pub outcome: Option<String>,
    pub http_status: Option<u16>,

    pub latency_ms: Option<u128>,

    /// `data:` frames seen, and how many of them could not be decoded.
    pub frames: u64,
    pub skipped_frames: u64,

    pub tokens_prompt: Option<u64>,
    pub tokens_completion: Option<u64>,
    pub tokens_total: Option<u64>,

    pub error_message: Option<String>,
}

impl StreamTrace {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }
    pub fn stream_id_opt(mut self, id: Option<&str>) -> Self {
        self.stream_id = id.map(|s| s.to_string());
        self
    }
    pub fn request_id_opt(mut self, rid: Option<&str>) -> Self {
        self.request_id = rid.map(|s| s.to_string());
        self
    }
    pub fn outcome(mut self, outcome: StreamOutcome) -> Self {
        self.outcome = Some(outcome.as_str().to_string());
        if let StreamOutcome::HttpError(status) = outcome {
            self.http_status = Some(status);
        }
        self
    }
    pub fn failed(mut self, message: &str) -> Self {
        self.outcome = Some("transport_error".to_string());
        self.error_message = Some(message.to_string());
        self
    }
    pub fn latency_ms(mut self, ms: u128) -> Self {
        self.latency_ms = Some(ms);
        self
    }
    pub fn frames(mut self, total: u64, skipped: u64) -> Self {
        self.frames = total;
        self.skipped_frames = skipped;
        self
    }
    pub fn usage(mut self, usage: Option<&Usage>) -> Self {
        if let Some(u) = usage {
            self.tokens_prompt = u.prompt_tokens;
            self.tokens_completion = u.completion_tokens;
            self.tokens_total = u.total();
        }
        self
    }

    /// Flattens the populated fields into `(key, value)` pairs named by
    /// [`super::keys`], for log lines and exporters.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        let mut put = |k: &'static str, v: Option<String>| {
            if let Some(v) = v {
                out.push((k, v));
            }
        };
        put(KEY_URL, self.url.clone());
        put(KEY_STREAM_ID, self.stream_id.clone());
        put(KEY_REQUEST_ID, self.request_id.clone());
        put(KEY_OUTCOME, self.outcome.clone());
        put(KEY_HTTP_STATUS, self.http_status.map(|s| s.to_string()));
        put(KEY_LATENCY_MS, self.latency_ms.map(|s| s.to_string()));
        put(KEY_FRAMES, Some(self.frames.to_string()));
        put(KEY_FRAMES_SKIPPED, Some(self.skipped_frames.to_string()));
        put(KEY_TOKENS_PROMPT, self.tokens_prompt.map(|s| s.to_string()));
        put(KEY_TOKENS_COMPLETION, self.tokens_completion.map(|s| s.to_string()));
        put(KEY_TOKENS_TOTAL, self.tokens_total.map(|s| s.to_string()));
        put(KEY_ERROR_MESSAGE, self.error_message.clone());
        out
    }
}
