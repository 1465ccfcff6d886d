//! Canonical events delivered to handlers.
//!
//! Contract:
//! - A stream emits an optional `Start`, then 0..n `Chunk` / `ToolCall` / `ToolResult`
//!   events, then at most one terminal event: `Done` or `Error`.
//! - After a terminal event, no further events are emitted.
//! - `Chunk` only carries text; tool payloads are always JSON objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dialect-independent event produced by the normalizer.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    Start {
        stream_id: String,
    },
    /// One text fragment, not the accumulated answer.
    Chunk {
        text: String,
        stream_id: String,
    },
    ToolCall {
        payload: Map<String, Value>,
        stream_id: Option<String>,
        usage: Option<Usage>,
    },
    ToolResult {
        payload: Map<String, Value>,
        stream_id: Option<String>,
        usage: Option<Usage>,
    },
    Done {
        full_text: String,
        stream_id: Option<String>,
        usage: Option<Usage>,
    },
    Error {
        message: String,
        code: Option<String>,
        http_status: Option<u16>,
    },
}

impl StreamEvent {
    /// Returns true if this event terminates the stream (`Done` or `Error`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Convenience accessor for `Chunk` contents.
    pub fn as_text_delta(&self) -> Option<&str> {
        match self {
            Self::Chunk { text, .. } => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Token and timing metrics reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_first_byte_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

// Wire names per field, most preferred first.
const TTFB_KEYS: &[&str] = &["timeToFirstByte", "time_to_first_byte", "ttfb"];
const PROMPT_KEYS: &[&str] = &["promptTokens", "prompt_tokens", "inputTokens", "input_tokens"];
const COMPLETION_KEYS: &[&str] = &[
    "completionTokens",
    "completion_tokens",
    "outputTokens",
    "output_tokens",
];
const TOTAL_KEYS: &[&str] = &["totalTokens", "total_tokens"];
const ELAPSED_KEYS: &[&str] = &["elapsedTime", "elapsed_time", "elapsedMs", "elapsed_ms"];

impl Usage {
    /// Reads a wire `usage` object. Returns `None` when the value is not an
    /// object or carries none of the known fields.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let usage = Self {
            time_to_first_byte_ms: pick(obj, TTFB_KEYS),
            prompt_tokens: pick(obj, PROMPT_KEYS),
            completion_tokens: pick(obj, COMPLETION_KEYS),
            total_tokens: pick(obj, TOTAL_KEYS),
            elapsed_ms: pick(obj, ELAPSED_KEYS),
        };
        if usage == Self::default() {
            None
        } else {
            Some(usage)
        }
    }

    /// Total tokens as reported, or prompt + completion when the backend left it out.
    pub fn total(&self) -> Option<u64> {
        self.total_tokens.or_else(|| {
            self.prompt_tokens
                .zip(self.completion_tokens)
                .and_then(|(p, c)| p.checked_add(c))
        })
    }
}

fn pick(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(as_count))
}

fn as_count(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

/// How a decode call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOutcome {
    /// A `Done` frame or the sentinel was seen.
    Completed,
    /// An in-band error frame was seen.
    Errored,
    /// The reader finished without a terminal frame.
    Ended,
    /// Non-success HTTP status; the body was not read.
    HttpError(u16),
    /// The session expired; credentials were cleared.
    AuthExpired,
}

impl StreamOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Ended => "ended",
            Self::HttpError(_) => "http_error",
            Self::AuthExpired => "auth_expired",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn helpers_work() {
        let d = StreamEvent::Chunk {
            text: "hi".into(),
            stream_id: "c1".into(),
        };
        assert!(!d.is_terminal());
        assert_eq!(d.as_text_delta(), Some("hi"));

        let s = StreamEvent::Done {
            full_text: "hi".into(),
            stream_id: None,
            usage: None,
        };
        assert!(s.is_terminal());
        assert_eq!(s.as_text_delta(), None);
    }

    #[test]
    fn usage_prefers_camel_case() {
        let u = Usage::from_wire(&json!({"promptTokens": 3, "prompt_tokens": 99, "completion_tokens": 2}))
            .unwrap();
        assert_eq!(u.prompt_tokens, Some(3));
        assert_eq!(u.completion_tokens, Some(2));
        assert_eq!(u.total_tokens, None);
        assert_eq!(u.total(), Some(5));
    }

    #[test]
    fn usage_accepts_input_output_names_and_float_timings() {
        let u = Usage::from_wire(&json!({
            "input_tokens": 10,
            "outputTokens": 4,
            "timeToFirstByte": 120.6,
            "elapsed_time": 900
        }))
        .unwrap();
        assert_eq!(u.prompt_tokens, Some(10));
        assert_eq!(u.completion_tokens, Some(4));
        assert_eq!(u.time_to_first_byte_ms, Some(121));
        assert_eq!(u.elapsed_ms, Some(900));
    }

    #[test]
    fn usage_absent_or_unknown_is_none() {
        assert_eq!(Usage::from_wire(&json!(null)), None);
        assert_eq!(Usage::from_wire(&json!({"cost": 1})), None);
        assert_eq!(Usage::from_wire(&json!({"promptTokens": "many"})), None);
    }

    #[test]
    fn usage_serializes_snake_case_without_gaps() {
        let u = Usage {
            prompt_tokens: Some(3),
            completion_tokens: Some(2),
            total_tokens: Some(5),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&u).unwrap(),
            json!({"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5})
        );
    }

    #[test]
    fn outcome_serializes_snake_case() {
        assert_eq!(serde_json::to_value(StreamOutcome::Completed).unwrap(), json!("completed"));
        assert_eq!(StreamOutcome::HttpError(500).as_str(), "http_error");
    }
}
