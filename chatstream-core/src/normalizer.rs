//! Maps dialect-specific wire events onto canonical [`StreamEvent`]s.
//!
//! The normalizer reads the stream state but never mutates it. It returns
//! [`Step`]s that the dispatcher applies in order.

use serde_json::{Map, Value};

use crate::config::DecoderCfg;
use crate::dialect::current::{CurrentFrame, CurrentKind};
use crate::dialect::{WireEvent, code_text, compat};
use crate::dispatch::StreamState;
use crate::stream::{StreamEvent, Usage};

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// First identifier seen on this stream.
    ClaimStreamId(String),
    /// Usage reported outside of a terminal frame.
    RecordUsage(Usage),
    Emit(StreamEvent),
}

/// Normalizes one wire event against the current stream state.
pub fn normalize(wire: WireEvent, state: &StreamState, cfg: &DecoderCfg) -> Vec<Step> {
    let frame_id = wire.stream_id().map(str::to_owned);
    let mut steps = Vec::new();

    match (state.stream_id(), frame_id.as_deref()) {
        (Some(known), Some(id)) if known != id => {
            tracing::debug!(
                stream_id = known,
                frame_stream_id = id,
                dialect = wire.dialect().as_str(),
                "dropping frame for a different stream id"
            );
            return steps;
        }
        (None, Some(id)) => steps.push(Step::ClaimStreamId(id.to_owned())),
        _ => {}
    }

    let ctx = Ctx {
        stream_id: state.stream_id().map(str::to_owned).or_else(|| frame_id.clone()),
        frame_id,
        full_text: state.full_text(),
        cfg,
    };
    match wire {
        WireEvent::Current(f) => current(f, &ctx, &mut steps),
        WireEvent::LegacyTyped(f) => compat::legacy_typed(f, &ctx, &mut steps),
        WireEvent::LegacyStatus(f) => compat::legacy_status(f, &ctx, &mut steps),
        WireEvent::ProviderNative(f) => compat::provider_native(f, &ctx, &mut steps),
    }
    steps
}

fn current(f: CurrentFrame, ctx: &Ctx, steps: &mut Vec<Step>) {
    let event = match f.kind {
        CurrentKind::Start => ctx.start(),
        CurrentKind::Assistant => ctx.chunk(f.content.as_ref()),
        // reasoning traces are not forwarded
        CurrentKind::Thinking => None,
        CurrentKind::ToolCall => ctx.tool_call(f.content, f.usage.as_ref()),
        CurrentKind::ToolResult => ctx.tool_result(f.content, f.usage.as_ref()),
        CurrentKind::Done => Some(ctx.done(None, f.usage.as_ref())),
        CurrentKind::Error => Some(ctx.error(f.message.as_ref(), f.content.as_ref(), f.code.as_ref())),
        CurrentKind::Unknown => {
            tracing::debug!("ignoring frame with unknown type");
            None
        }
    };
    steps.extend(event.map(Step::Emit));
}

/// What a dialect mapper may consult while building events.
pub(crate) struct Ctx<'a> {
    /// Identifier on the frame itself.
    frame_id: Option<String>,
    /// Identifier of the stream: the captured one, else the frame's.
    stream_id: Option<String>,
    full_text: &'a str,
    cfg: &'a DecoderCfg,
}

impl Ctx<'_> {
    pub(crate) fn start(&self) -> Option<StreamEvent> {
        let stream_id = self.frame_id.clone()?;
        Some(StreamEvent::Start { stream_id })
    }

    pub(crate) fn chunk(&self, content: Option<&Value>) -> Option<StreamEvent> {
        let text = content?.as_str()?;
        let stream_id = self.frame_id.clone()?;
        Some(StreamEvent::Chunk {
            text: text.to_owned(),
            stream_id,
        })
    }

    pub(crate) fn tool_call(&self, content: Option<Value>, usage: Option<&Value>) -> Option<StreamEvent> {
        let payload = object(content)?;
        Some(StreamEvent::ToolCall {
            payload,
            stream_id: self.stream_id.clone(),
            usage: usage.and_then(Usage::from_wire),
        })
    }

    pub(crate) fn tool_result(&self, content: Option<Value>, usage: Option<&Value>) -> Option<StreamEvent> {
        let payload = object(content)?;
        Some(StreamEvent::ToolResult {
            payload,
            stream_id: self.stream_id.clone(),
            usage: usage.and_then(Usage::from_wire),
        })
    }

    /// `full_text` overrides the accumulated text when the frame carries its own.
    pub(crate) fn done(&self, full_text: Option<String>, usage: Option<&Value>) -> StreamEvent {
        StreamEvent::Done {
            full_text: full_text.unwrap_or_else(|| self.full_text.to_owned()),
            stream_id: self.stream_id.clone(),
            usage: usage.and_then(Usage::from_wire),
        }
    }

    /// The first non-empty string among `message` and `fallback` wins.
    pub(crate) fn error(
        &self,
        message: Option<&Value>,
        fallback: Option<&Value>,
        code: Option<&Value>,
    ) -> StreamEvent {
        let message = [message, fallback]
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .find(|s| !s.trim().is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| self.cfg.default_error_message.clone());
        StreamEvent::Error {
            message,
            code: code_text(code),
            http_status: None,
        }
    }
}

fn object(content: Option<Value>) -> Option<Map<String, Value>> {
    match content? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
