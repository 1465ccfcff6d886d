//! Telemetry primitives for decoded streams.
//! By default, no telemetry is emitted unless a sink is installed via `set_telemetry_sink`.

pub mod keys;
pub mod types;
#[cfg(test)]
pub mod test_span;

pub use keys::*;
pub use types::*;

use std::sync::Arc;

use once_cell::sync::OnceCell;

/// Implement this to receive one [`StreamTrace`] per decode call.
///
/// Implementations must be thread-safe and should not panic; `record` runs on
/// the task that finished decoding.
pub trait TelemetrySink: Send + Sync + 'static {
    fn record(&self, trace: StreamTrace);
}

static TELEMETRY_SINK: OnceCell<Arc<dyn TelemetrySink>> = OnceCell::new();

// In tests, gate emission to only the calling test thread to avoid cross-test interference.
#[cfg(test)]
thread_local! {
    static TEST_CAPTURE: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Install a global telemetry sink. Returns `false` if a sink is already installed.
///
/// This is a write-once global for the process lifetime (backed by `OnceCell`).
pub fn set_telemetry_sink(sink: Arc<dyn TelemetrySink>) -> bool {
    TELEMETRY_SINK.set(sink).is_ok()
}

/// Logs the trace's attributes at debug level and hands the trace to the
/// sink, if one is installed.
///
/// In tests, sink emission is suppressed unless explicitly enabled via `test_set_capture_enabled`.
pub(crate) fn emit(trace: StreamTrace) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        let attributes = trace
            .attributes()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::debug!(attributes = %attributes, "stream trace");
    }
    #[cfg(test)]
    {
        if !TEST_CAPTURE.with(|c| c.get()) {
            return;
        }
    }
    if let Some(sink) = TELEMETRY_SINK.get() {
        sink.record(trace);
    }
}

#[cfg(test)]
/// Test-only helper: enable or disable capture for the current test thread.
pub fn test_set_capture_enabled(enabled: bool) {
    TEST_CAPTURE.with(|c| c.set(enabled));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamOutcome;

    #[test]
    fn emit_logs_trace_attributes() {
        let (store, _guard) = test_span::install_capture();
        emit(
            StreamTrace::new()
                .url("http://backend/chat")
                .stream_id_opt(Some("c7"))
                .outcome(StreamOutcome::Completed)
                .frames(4, 1),
        );
        let fields = store.event_fields("stream trace").expect("trace logged");
        let attributes = fields.get("attributes").unwrap();
        assert!(attributes.contains(&format!("{KEY_STREAM_ID}=c7")));
        assert!(attributes.contains(&format!("{KEY_OUTCOME}=completed")));
        assert!(attributes.contains(&format!("{KEY_FRAMES_SKIPPED}=1")));
        assert!(!attributes.contains(KEY_ERROR_MESSAGE));
    }
}
