//! Per-stream accumulation and handler dispatch.

use crate::handler::EventHandler;
use crate::normalizer::Step;
use crate::stream::{StreamEvent, Usage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminal {
    #[default]
    Open,
    Completed,
    Errored,
}

/// Running state of one stream. Each decode call owns exactly one.
#[derive(Debug, Default)]
pub struct StreamState {
    full_text: String,
    stream_id: Option<String>,
    usage: Option<Usage>,
    terminal: Terminal,
}

impl StreamState {
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    pub fn terminal(&self) -> Terminal {
        self.terminal
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal != Terminal::Open
    }

    /// Sets the stream id unless one is already set; the first id wins.
    pub(crate) fn claim_stream_id(&mut self, id: &str) {
        if self.stream_id.is_none() {
            tracing::Span::current().record("stream_id", id);
            self.stream_id = Some(id.to_owned());
        }
    }

    pub(crate) fn append_text(&mut self, fragment: &str) {
        self.full_text.push_str(fragment);
    }

    /// Applies one normalizer step. Once the stream is terminal every step is
    /// a no-op, so at most one terminal callback ever fires.
    pub fn apply<H: EventHandler + ?Sized>(&mut self, step: Step, handler: &mut H) {
        if self.is_terminal() {
            tracing::debug!(terminal = ?self.terminal, "ignoring event after terminal");
            return;
        }
        match step {
            Step::ClaimStreamId(id) => self.claim_stream_id(&id),
            Step::RecordUsage(usage) => self.usage = Some(usage),
            Step::Emit(event) => self.dispatch(event, handler),
        }
    }

    /// Handles the `[DONE]` sentinel: completes the stream with what has
    /// accumulated so far, unless it is already terminal.
    pub fn complete<H: EventHandler + ?Sized>(&mut self, handler: &mut H) {
        let done = StreamEvent::Done {
            full_text: self.full_text.clone(),
            stream_id: self.stream_id.clone(),
            usage: None,
        };
        self.apply(Step::Emit(done), handler);
    }

    fn dispatch<H: EventHandler + ?Sized>(&mut self, event: StreamEvent, handler: &mut H) {
        match event {
            StreamEvent::Start { stream_id } => handler.on_start(&stream_id),
            StreamEvent::Chunk { text, stream_id } => {
                self.append_text(&text);
                handler.on_chunk(&text, &stream_id);
            }
            StreamEvent::ToolCall {
                payload,
                stream_id,
                usage,
            } => handler.on_tool_call(&payload, stream_id.as_deref(), usage.as_ref()),
            StreamEvent::ToolResult {
                payload,
                stream_id,
                usage,
            } => handler.on_tool_response(&payload, stream_id.as_deref(), usage.as_ref()),
            StreamEvent::Done {
                full_text,
                stream_id,
                usage,
            } => {
                self.terminal = Terminal::Completed;
                if usage.is_some() {
                    self.usage = usage;
                }
                self.full_text = full_text;
                handler.on_complete(&self.full_text, stream_id.as_deref(), self.usage.as_ref());
            }
            StreamEvent::Error {
                message,
                code,
                http_status,
            } => {
                self.terminal = Terminal::Errored;
                handler.on_error(&message, code.as_deref(), http_status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::EventLog;

    fn chunk(text: &str) -> Step {
        Step::Emit(StreamEvent::Chunk {
            text: text.into(),
            stream_id: "x".into(),
        })
    }

    #[test]
    fn chunks_accumulate_but_handler_sees_fragments() {
        let mut state = StreamState::default();
        let mut log = EventLog::new();
        state.apply(Step::ClaimStreamId("x".into()), &mut log);
        state.apply(chunk("Hel"), &mut log);
        state.apply(chunk("lo"), &mut log);
        assert_eq!(state.full_text(), "Hello");
        assert_eq!(log.events.len(), 2);
        assert_eq!(log.events[1].as_text_delta(), Some("lo"));
    }

    #[test]
    fn first_stream_id_wins() {
        let mut state = StreamState::default();
        let mut log = EventLog::new();
        state.apply(Step::ClaimStreamId("a".into()), &mut log);
        state.apply(Step::ClaimStreamId("b".into()), &mut log);
        assert_eq!(state.stream_id(), Some("a"));
    }

    #[test]
    fn done_then_sentinel_completes_once() {
        let mut state = StreamState::default();
        let mut log = EventLog::new();
        state.apply(chunk("hi"), &mut log);
        state.apply(
            Step::Emit(StreamEvent::Done {
                full_text: "hi".into(),
                stream_id: None,
                usage: None,
            }),
            &mut log,
        );
        state.complete(&mut log);
        let dones = log.events.iter().filter(|e| matches!(e, StreamEvent::Done { .. })).count();
        assert_eq!(dones, 1);
        assert_eq!(state.terminal(), Terminal::Completed);
    }

    #[test]
    fn sentinel_completion_reports_recorded_usage() {
        let mut state = StreamState::default();
        let mut log = EventLog::new();
        let usage = Usage {
            prompt_tokens: Some(2),
            ..Default::default()
        };
        state.apply(Step::RecordUsage(usage.clone()), &mut log);
        state.apply(chunk("ok"), &mut log);
        state.complete(&mut log);
        assert_eq!(
            log.events.last(),
            Some(&StreamEvent::Done {
                full_text: "ok".into(),
                stream_id: None,
                usage: Some(usage),
            })
        );
    }

    #[test]
    fn tool_usage_stays_with_the_tool_event() {
        let mut state = StreamState::default();
        let mut log = EventLog::new();
        let usage = Usage {
            prompt_tokens: Some(7),
            ..Default::default()
        };
        state.apply(
            Step::Emit(StreamEvent::ToolResult {
                payload: serde_json::Map::new(),
                stream_id: Some("t".into()),
                usage: Some(usage),
            }),
            &mut log,
        );
        state.apply(
            Step::Emit(StreamEvent::Done {
                full_text: String::new(),
                stream_id: Some("t".into()),
                usage: None,
            }),
            &mut log,
        );
        assert!(state.usage().is_none());
        assert_eq!(
            log.events.last(),
            Some(&StreamEvent::Done {
                full_text: String::new(),
                stream_id: Some("t".into()),
                usage: None,
            })
        );
    }

    #[test]
    fn nothing_fires_after_error() {
        let mut state = StreamState::default();
        let mut log = EventLog::new();
        state.apply(
            Step::Emit(StreamEvent::Error {
                message: "boom".into(),
                code: Some("E1".into()),
                http_status: None,
            }),
            &mut log,
        );
        state.apply(chunk("late"), &mut log);
        state.complete(&mut log);
        assert_eq!(log.events.len(), 1);
        assert_eq!(state.terminal(), Terminal::Errored);
        assert_eq!(state.full_text(), "");
    }
}
