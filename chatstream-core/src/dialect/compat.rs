//! Older and foreign wire dialects still seen in the wild.
//!
//! Everything here is switchable through `DecoderCfg::legacy_dialects`. Once
//! the backend has fully migrated to the current dialect this module, its
//! three `WireEvent` variants, and the matching arms in the normalizer can be
//! deleted.

use serde::Deserialize;
use serde_json::Value;

use crate::normalizer::{Ctx, Step};

// ---- legacy-typed: {"msgType": "ANSWER", ...} ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegacyKind {
    User,
    ToolCall,
    ToolResponse,
    Answer,
    Stop,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTypedFrame {
    pub msg_type: LegacyKind,
    #[serde(default, deserialize_with = "super::opt_id")]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub usage: Option<Value>,
}

// ---- legacy-status: {"status": "chunk", ...} ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Start,
    Chunk,
    Complete,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyStatusFrame {
    pub status: StatusKind,
    #[serde(default, deserialize_with = "super::opt_id")]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub full_content: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub usage: Option<Value>,
}

// ---- provider-native: OpenAI-style chat.completion.chunk ----

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderChunk {
    #[serde(default, deserialize_with = "super::opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ProviderChoice>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderChoice {
    #[serde(default)]
    pub delta: Option<ProviderDelta>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderDelta {
    #[serde(default)]
    pub content: Option<Value>,
}

pub(crate) fn legacy_typed(f: LegacyTypedFrame, ctx: &Ctx, steps: &mut Vec<Step>) {
    let event = match f.msg_type {
        // echo of the user's own message; only its id matters
        LegacyKind::User => None,
        LegacyKind::Answer => ctx.chunk(f.content.as_ref()),
        LegacyKind::ToolCall => ctx.tool_call(f.content, f.usage.as_ref()),
        LegacyKind::ToolResponse => ctx.tool_result(f.content, f.usage.as_ref()),
        LegacyKind::Stop => Some(ctx.done(None, f.usage.as_ref())),
        LegacyKind::Error => Some(ctx.error(f.message.as_ref(), f.content.as_ref(), f.code.as_ref())),
        LegacyKind::Unknown => {
            tracing::debug!("ignoring legacy frame with unknown msgType");
            None
        }
    };
    steps.extend(event.map(Step::Emit));
}

pub(crate) fn legacy_status(f: LegacyStatusFrame, ctx: &Ctx, steps: &mut Vec<Step>) {
    let event = match f.status {
        StatusKind::Start => ctx.start(),
        StatusKind::Chunk => ctx.chunk(f.content.as_ref()),
        StatusKind::Complete => {
            let full = f.full_content.and_then(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            });
            Some(ctx.done(full, f.usage.as_ref()))
        }
        StatusKind::Error => Some(ctx.error(f.error.as_ref(), f.message.as_ref(), f.code.as_ref())),
        StatusKind::Unknown => {
            tracing::debug!("ignoring legacy frame with unknown status");
            None
        }
    };
    steps.extend(event.map(Step::Emit));
}

pub(crate) fn provider_native(f: ProviderChunk, ctx: &Ctx, steps: &mut Vec<Step>) {
    for choice in &f.choices {
        let content = choice.delta.as_ref().and_then(|d| d.content.as_ref());
        // opening deltas often carry only a role or an empty string
        if content.and_then(Value::as_str).is_some_and(str::is_empty) {
            continue;
        }
        if let Some(event) = ctx.chunk(content) {
            steps.push(Step::Emit(event));
        }
    }
    if let Some(usage) = f.usage.as_ref().and_then(crate::stream::Usage::from_wire) {
        steps.push(Step::RecordUsage(usage));
    }
}
