//! The current wire dialect: `{"type": "...", "chatId": "...", ...}`.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrentKind {
    Start,
    Assistant,
    Thinking,
    ToolCall,
    ToolResult,
    Done,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentFrame {
    #[serde(rename = "type")]
    pub kind: CurrentKind,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_call() {
        let f: CurrentFrame = serde_json::from_str(
            r#"{"type":"TOOL_CALL","chatId":"c","content":{"name":"search"},"usage":{"totalTokens":4}}"#,
        )
        .unwrap();
        assert_eq!(f.kind, CurrentKind::ToolCall);
        assert_eq!(f.chat_id.as_deref(), Some("c"));
        assert!(f.content.unwrap().is_object());
        assert!(f.usage.is_some());
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let f: CurrentFrame = serde_json::from_str(r#"{"type":"HEARTBEAT"}"#).unwrap();
        assert_eq!(f.kind, CurrentKind::Unknown);
        assert_eq!(f.chat_id, None);
    }

    #[test]
    fn non_string_type_is_a_shape_error() {
        assert!(serde_json::from_str::<CurrentFrame>(r#"{"type":7}"#).is_err());
    }
}
