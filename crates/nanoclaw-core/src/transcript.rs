//! Parser for the interactive engine's JSONL transcript.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptRecord {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<RecordMessage>,
}

#[derive(Debug, Deserialize)]
struct RecordMessage {
    #[serde(default)]
    content: Value,
}

/// Extract user and assistant text messages in file order.
///
/// Blank and malformed lines are skipped, as are records whose text is empty.
pub fn parse_transcript(content: &str) -> Vec<ParsedMessage> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<TranscriptRecord>(line).ok())
        .filter_map(record_to_message)
        .collect()
}

fn record_to_message(record: TranscriptRecord) -> Option<ParsedMessage> {
    let content = record.message?.content;
    let (role, text) = match record.kind.as_deref()? {
        "user" => (Role::User, user_text(&content)?),
        "assistant" => (Role::Assistant, assistant_text(&content)?),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Some(ParsedMessage {
        role,
        content: text,
    })
}

fn user_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => Some(
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect(),
        ),
        _ => None,
    }
}

fn assistant_text(content: &Value) -> Option<String> {
    let parts = content.as_array()?;
    Some(
        parts
            .iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect(),
    )
}
