//! Claude Code JSONL records
//!
//! Session logs live at `~/.claude/projects/[encoded-path]/[session-id].jsonl`.
//! Each line is one record. Conversational records carry `type: "user"` or
//! `type: "assistant"` with a `message` holding `role` and `content`; other
//! kinds (`summary`, `file-history-snapshot`, `system`, ...) carry no role and
//! are skipped downstream.

use super::{content_from_value, role_from_str, LogRecord};
use serde::Deserialize;

/// Represents a single line from Claude Code JSONL.
///
/// Uses `#[serde(default)]` liberally to handle missing fields gracefully.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawRecord {
    #[serde(rename = "type")]
    record_type: Option<String>,
    timestamp: Option<String>,
    is_meta: Option<bool>,
    is_sidechain: Option<bool>,
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawMessage {
    role: Option<String>,
    content: Option<serde_json::Value>,
}

/// Parse one Claude Code transcript line.
///
/// Returns `None` for blank lines and anything that is not a JSON object.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let raw: RawRecord = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed Claude record");
            return None;
        }
    };

    let kind = raw.record_type.unwrap_or_else(|| "unknown".to_string());

    // Sidechain records belong to subagent transcripts, not the main thread
    let role = if raw.is_sidechain.unwrap_or(false) {
        None
    } else {
        match kind.as_str() {
            "user" | "assistant" => raw
                .message
                .as_ref()
                .and_then(|m| role_from_str(m.role.as_deref()))
                .or_else(|| role_from_str(Some(&kind))),
            _ => None,
        }
    };

    let content = content_from_value(raw.message.as_ref().and_then(|m| m.content.as_ref()));

    Some(LogRecord {
        kind,
        role,
        content,
        timestamp: raw.timestamp,
        is_meta: raw.is_meta.unwrap_or(false),
    })
}
