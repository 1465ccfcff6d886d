//! Payload classification.
//!
//! The backend has emitted several JSON shapes over time, sometimes
//! concurrently. A payload is assigned to exactly one dialect by structural
//! predicates tried in [`DIALECT_PRECEDENCE`] order; the first match wins.

pub mod compat;
pub mod current;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub use compat::{LegacyStatusFrame, LegacyTypedFrame, ProviderChunk};
pub use current::CurrentFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `type` present, `msgType` absent.
    Current,
    /// `msgType` present.
    LegacyTyped,
    /// `status` present.
    LegacyStatus,
    /// `object == "chat.completion.chunk"`.
    ProviderNative,
}

/// Order in which dialect predicates are tried. Current comes first so a
/// backend mid-migration can send either shape.
pub const DIALECT_PRECEDENCE: [Dialect; 4] = [
    Dialect::Current,
    Dialect::LegacyTyped,
    Dialect::LegacyStatus,
    Dialect::ProviderNative,
];

impl Dialect {
    pub fn matches(self, obj: &Map<String, Value>) -> bool {
        match self {
            Self::Current => obj.contains_key("type") && !obj.contains_key("msgType"),
            Self::LegacyTyped => obj.contains_key("msgType"),
            Self::LegacyStatus => obj.contains_key("status"),
            Self::ProviderNative => {
                obj.get("object").and_then(Value::as_str) == Some("chat.completion.chunk")
            }
        }
    }

    pub fn is_legacy(self) -> bool {
        !matches!(self, Self::Current)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::LegacyTyped => "legacy_typed",
            Self::LegacyStatus => "legacy_status",
            Self::ProviderNative => "provider_native",
        }
    }
}

/// One decoded payload, tagged with its dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    Current(CurrentFrame),
    LegacyTyped(LegacyTypedFrame),
    LegacyStatus(LegacyStatusFrame),
    ProviderNative(ProviderChunk),
}

impl WireEvent {
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Current(_) => Dialect::Current,
            Self::LegacyTyped(_) => Dialect::LegacyTyped,
            Self::LegacyStatus(_) => Dialect::LegacyStatus,
            Self::ProviderNative(_) => Dialect::ProviderNative,
        }
    }

    /// Stream identifier carried by this frame, if any.
    pub fn stream_id(&self) -> Option<&str> {
        match self {
            Self::Current(f) => f.chat_id.as_deref(),
            Self::LegacyTyped(f) => f.chat_id.as_deref(),
            Self::LegacyStatus(f) => f.chat_id.as_deref(),
            Self::ProviderNative(f) => f.id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Event(WireEvent),
    /// Valid JSON matching no dialect.
    Unrecognized,
    /// A legacy dialect while legacy support is switched off.
    Disabled(Dialect),
}

/// Picks the dialect of a parsed payload.
pub fn detect(value: &Value) -> Option<Dialect> {
    let obj = value.as_object()?;
    DIALECT_PRECEDENCE.into_iter().find(|d| d.matches(obj))
}

/// Parses and classifies one frame payload.
///
/// Errors are per-frame: the caller logs them and moves on to the next frame.
pub fn classify(payload: &str, legacy_enabled: bool) -> serde_json::Result<Classified> {
    let value: Value = serde_json::from_str(payload)?;
    let Some(dialect) = detect(&value) else {
        return Ok(Classified::Unrecognized);
    };
    if dialect.is_legacy() && !legacy_enabled {
        return Ok(Classified::Disabled(dialect));
    }
    let event = match dialect {
        Dialect::Current => WireEvent::Current(serde_json::from_value(value)?),
        Dialect::LegacyTyped => WireEvent::LegacyTyped(serde_json::from_value(value)?),
        Dialect::LegacyStatus => WireEvent::LegacyStatus(serde_json::from_value(value)?),
        Dialect::ProviderNative => WireEvent::ProviderNative(serde_json::from_value(value)?),
    };
    Ok(Classified::Event(event))
}

/// Accepts string or numeric identifiers; anything else reads as absent.
pub(crate) fn opt_id<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Error codes arrive as strings or numbers.
pub(crate) fn code_text(code: Option<&Value>) -> Option<String> {
    match code? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
