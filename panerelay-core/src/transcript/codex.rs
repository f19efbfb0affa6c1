//! OpenAI Codex CLI rollout records
//!
//! Session logs live at `~/.codex/sessions/YYYY/MM/DD/rollout-*.jsonl`. Every
//! line is `{timestamp, type, payload}`. Conversation content arrives as
//! `response_item` payloads; `event_msg` payloads duplicate it for the TUI and
//! are ignored here, as are `session_meta` and `turn_context`.
//!
//! | `response_item.payload.type` | Mapped to |
//! |------------------------------|-----------|
//! | `message` (user/assistant) | text blocks |
//! | `function_call`, `custom_tool_call` | assistant `tool_use` |
//! | `function_call_output`, `custom_tool_call_output` | user `tool_result` |
//! | `reasoning` | assistant `thinking` |

use super::{
    content_from_value, is_system_injected_context, record_text, role_from_str, ContentBlock,
    LogRecord, RecordContent,
};
use crate::types::Role;
use serde::Deserialize;

/// Top-level event container for Codex JSONL records.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawEvent {
    timestamp: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    payload: serde_json::Value,
}

/// Response item payload subtypes.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ResponseItemPayload {
    #[serde(rename = "type")]
    item_type: Option<String>,
    role: Option<String>,
    content: Option<serde_json::Value>,
    name: Option<String>,
    call_id: Option<String>,
    summary: Option<Vec<SummaryPart>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SummaryPart {
    text: Option<String>,
}

/// Parse one Codex rollout line.
///
/// Returns `None` for blank lines and anything that is not a JSON object.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let event: RawEvent = match serde_json::from_str(line) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed Codex record");
            return None;
        }
    };

    let event_type = event.event_type.unwrap_or_else(|| "unknown".to_string());
    let mut record = LogRecord {
        kind: event_type.clone(),
        timestamp: event.timestamp,
        ..Default::default()
    };

    if event_type != "response_item" {
        return Some(record);
    }

    let payload: ResponseItemPayload = serde_json::from_value(event.payload).unwrap_or_default();
    let item_type = payload.item_type.as_deref().unwrap_or("unknown");
    record.kind = item_type.to_string();

    match item_type {
        "message" => {
            record.content = content_from_value(payload.content.as_ref());
            record.role = role_from_str(payload.role.as_deref());

            // Environment and instruction preambles are sent as "user" but are metadata
            if record.role == Some(Role::User) && is_system_injected_context(&record_text(&record))
            {
                record.kind = "context".to_string();
                record.role = None;
                record.is_meta = true;
            }
        }
        "function_call" | "custom_tool_call" => {
            record.role = Some(Role::Assistant);
            record.content = RecordContent::Blocks(vec![ContentBlock::ToolUse {
                id: payload.call_id,
                name: payload.name.unwrap_or_else(|| "unknown".to_string()),
            }]);
        }
        "function_call_output" | "custom_tool_call_output" => {
            record.role = Some(Role::User);
            record.content = RecordContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: payload.call_id,
            }]);
        }
        "reasoning" => {
            let thinking: Vec<String> = payload
                .summary
                .unwrap_or_default()
                .into_iter()
                .filter_map(|part| part.text)
                .collect();
            record.role = Some(Role::Assistant);
            record.content = RecordContent::Blocks(vec![ContentBlock::Thinking {
                thinking: thinking.join("\n"),
            }]);
        }
        _ => {}
    }

    Some(record)
}
