use serde_json::{Map, Value};

use crate::stream::{StreamEvent, Usage};

/// Receives canonical events for one stream.
///
/// Every method defaults to a no-op, so implementors only override what they
/// need. Calls are synchronous with the read loop: long work belongs on a
/// separately spawned task.
pub trait EventHandler {
    fn on_start(&mut self, _stream_id: &str) {}

    /// `fragment` is the new text only, not the running answer.
    fn on_chunk(&mut self, _fragment: &str, _stream_id: &str) {}

    fn on_tool_call(
        &mut self,
        _payload: &Map<String, Value>,
        _stream_id: Option<&str>,
        _usage: Option<&Usage>,
    ) {
    }

    fn on_tool_response(
        &mut self,
        _payload: &Map<String, Value>,
        _stream_id: Option<&str>,
        _usage: Option<&Usage>,
    ) {
    }

    fn on_complete(&mut self, _full_text: &str, _stream_id: Option<&str>, _usage: Option<&Usage>) {}

    fn on_error(&mut self, _message: &str, _code: Option<&str>, _http_status: Option<u16>) {}
}

type StartFn = Box<dyn FnMut(&str) + Send>;
type ChunkFn = Box<dyn FnMut(&str, &str) + Send>;
type ToolFn = Box<dyn FnMut(&Map<String, Value>, Option<&str>, Option<&Usage>) + Send>;
type CompleteFn = Box<dyn FnMut(&str, Option<&str>, Option<&Usage>) + Send>;
type ErrorFn = Box<dyn FnMut(&str, Option<&str>, Option<u16>) + Send>;

/// Closure-based handler; unset callbacks drop their events.
#[derive(Default)]
pub struct Callbacks {
    start: Option<StartFn>,
    chunk: Option<ChunkFn>,
    tool_call: Option<ToolFn>,
    tool_response: Option<ToolFn>,
    complete: Option<CompleteFn>,
    error: Option<ErrorFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn with_chunk(mut self, f: impl FnMut(&str, &str) + Send + 'static) -> Self {
        self.chunk = Some(Box::new(f));
        self
    }

    pub fn with_tool_call(
        mut self,
        f: impl FnMut(&Map<String, Value>, Option<&str>, Option<&Usage>) + Send + 'static,
    ) -> Self {
        self.tool_call = Some(Box::new(f));
        self
    }

    pub fn with_tool_response(
        mut self,
        f: impl FnMut(&Map<String, Value>, Option<&str>, Option<&Usage>) + Send + 'static,
    ) -> Self {
        self.tool_response = Some(Box::new(f));
        self
    }

    pub fn with_complete(
        mut self,
        f: impl FnMut(&str, Option<&str>, Option<&Usage>) + Send + 'static,
    ) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    pub fn with_error(
        mut self,
        f: impl FnMut(&str, Option<&str>, Option<u16>) + Send + 'static,
    ) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("start", &self.start.is_some())
            .field("chunk", &self.chunk.is_some())
            .field("tool_call", &self.tool_call.is_some())
            .field("tool_response", &self.tool_response.is_some())
            .field("complete", &self.complete.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl EventHandler for Callbacks {
    fn on_start(&mut self, stream_id: &str) {
        if let Some(f) = self.start.as_mut() {
            f(stream_id);
        }
    }

    fn on_chunk(&mut self, fragment: &str, stream_id: &str) {
        if let Some(f) = self.chunk.as_mut() {
            f(fragment, stream_id);
        }
    }

    fn on_tool_call(&mut self, payload: &Map<String, Value>, stream_id: Option<&str>, usage: Option<&Usage>) {
        if let Some(f) = self.tool_call.as_mut() {
            f(payload, stream_id, usage);
        }
    }

    fn on_tool_response(
        &mut self,
        payload: &Map<String, Value>,
        stream_id: Option<&str>,
        usage: Option<&Usage>,
    ) {
        if let Some(f) = self.tool_response.as_mut() {
            f(payload, stream_id, usage);
        }
    }

    fn on_complete(&mut self, full_text: &str, stream_id: Option<&str>, usage: Option<&Usage>) {
        if let Some(f) = self.complete.as_mut() {
            f(full_text, stream_id, usage);
        }
    }

    fn on_error(&mut self, message: &str, code: Option<&str>, http_status: Option<u16>) {
        if let Some(f) = self.error.as_mut() {
            f(message, code, http_status);
        }
    }
}

/// Records every event in arrival order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventLog {
    pub events: Vec<StreamEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenation of every chunk seen so far.
    pub fn text(&self) -> String {
        self.events.iter().filter_map(StreamEvent::as_text_delta).collect()
    }

    pub fn terminal(&self) -> Option<&StreamEvent> {
        self.events.iter().find(|e| e.is_terminal())
    }
}

impl EventHandler for EventLog {
    fn on_start(&mut self, stream_id: &str) {
        self.events.push(StreamEvent::Start {
            stream_id: stream_id.to_owned(),
        });
    }

    fn on_chunk(&mut self, fragment: &str, stream_id: &str) {
        self.events.push(StreamEvent::Chunk {
            text: fragment.to_owned(),
            stream_id: stream_id.to_owned(),
        });
    }

    fn on_tool_call(&mut self, payload: &Map<String, Value>, stream_id: Option<&str>, usage: Option<&Usage>) {
        self.events.push(StreamEvent::ToolCall {
            payload: payload.clone(),
            stream_id: stream_id.map(str::to_owned),
            usage: usage.cloned(),
        });
    }

    fn on_tool_response(
        &mut self,
        payload: &Map<String, Value>,
        stream_id: Option<&str>,
        usage: Option<&Usage>,
    ) {
        self.events.push(StreamEvent::ToolResult {
            payload: payload.clone(),
            stream_id: stream_id.map(str::to_owned),
            usage: usage.cloned(),
        });
    }

    fn on_complete(&mut self, full_text: &str, stream_id: Option<&str>, usage: Option<&Usage>) {
        self.events.push(StreamEvent::Done {
            full_text: full_text.to_owned(),
            stream_id: stream_id.map(str::to_owned),
            usage: usage.cloned(),
        });
    }

    fn on_error(&mut self, message: &str, code: Option<&str>, http_status: Option<u16>) {
        self.events.push(StreamEvent::Error {
            message: message.to_owned(),
            code: code.map(str::to_owned),
            http_status,
        });
    }
}
