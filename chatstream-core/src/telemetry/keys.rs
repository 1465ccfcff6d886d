/// Span/Log attribute keys for decoded streams.
/// Keep these stable; changing them is a breaking change for dashboards.
pub const KEY_URL: &str = "stream.url";
pub const KEY_STREAM_ID: &str = "stream.id";
pub const KEY_REQUEST_ID: &str = "req.id"; // server correlation id, if returned
pub const KEY_OUTCOME: &str = "stream.outcome";
pub const KEY_HTTP_STATUS: &str = "http.status";

pub const KEY_LATENCY_MS: &str = "latency.ms";
pub const KEY_FRAMES: &str = "frames.total";
pub const KEY_FRAMES_SKIPPED: &str = "frames.skipped";
pub const KEY_TOKENS_PROMPT: &str = "tokens.prompt";
pub const KEY_TOKENS_COMPLETION: &str = "tokens.completion";
pub const KEY_TOKENS_TOTAL: &str = "tokens.total";

/// Error-related (if applicable)
pub const KEY_ERROR_MESSAGE: &str = "error.message";
