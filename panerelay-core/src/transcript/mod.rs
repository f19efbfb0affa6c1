//! Structured-log entry parsing
//!
//! Agent transcripts are append-only JSONL files. Each backend writes its own
//! record shape; the per-backend modules ([`claude`], [`codex`]) turn one line
//! into a [`LogRecord`], and everything after that is shared:
//!
//! ```text
//! line ──► claude::parse_line / codex::parse_line ──► LogRecord
//!                                                        │
//!                 PendingToolMap ──► parse_entries ◄─────┘
//!                       ▲                 │
//!                       └──── returned ───┴──► Vec<AgentMessage>
//! ```
//!
//! # Error Handling
//!
//! Nothing in this module fails. Blank lines, malformed JSON, unknown record
//! kinds and unknown block shapes are all skipped or degraded to empty text.
//! A corrupt transcript must never stall the relay.
//!
//! # Pending tools
//!
//! Tool invocations and their results arrive in different records, often in
//! different polling batches. The caller owns a [`PendingToolMap`], moves it
//! into [`parse_entries`] and gets the updated map back with the messages.

pub mod claude;
pub mod codex;

use crate::types::{AgentMessage, ContentType, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================
// Normalized record shape
// ============================================

/// One decoded transcript line, normalized across backends.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogRecord {
    /// Record kind as declared by the backend (`user`, `summary`, `response_item`, ...)
    pub kind: String,
    /// Declared role; `None` for metadata records
    pub role: Option<Role>,
    pub content: RecordContent,
    pub timestamp: Option<String>,
    /// Backend flagged this record as injected context rather than a real turn
    pub is_meta: bool,
}

/// Payload of a record: a bare string or an ordered list of typed blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecordContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    /// Missing, or neither a string nor a list
    #[default]
    Other,
}

/// A typed content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text { text: String },
    Thinking { thinking: String },
    ToolUse { id: Option<String>, name: String },
    ToolResult { tool_use_id: Option<String> },
    Unknown,
}

impl LogRecord {
    fn has_tool_result(&self) -> bool {
        matches!(&self.content, RecordContent::Blocks(blocks)
            if blocks.iter().any(|b| matches!(b, ContentBlock::ToolResult { .. })))
    }
}

/// Wire shape of a block, shared by every backend that uses typed blocks.
///
/// Deserialized one block at a time so a single bad block only degrades
/// itself to [`ContentBlock::Unknown`].
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawBlock {
    #[serde(rename = "text", alias = "input_text", alias = "output_text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl From<RawBlock> for ContentBlock {
    fn from(raw: RawBlock) -> Self {
        match raw {
            RawBlock::Text { text } => ContentBlock::Text { text },
            RawBlock::Thinking { thinking } => ContentBlock::Thinking { thinking },
            RawBlock::ToolUse { id, name } => ContentBlock::ToolUse {
                id,
                name: name.unwrap_or_else(|| "unknown".to_string()),
            },
            RawBlock::ToolResult { tool_use_id } => ContentBlock::ToolResult { tool_use_id },
            RawBlock::Unknown => ContentBlock::Unknown,
        }
    }
}

/// Convert a raw JSON payload into [`RecordContent`].
pub(crate) fn content_from_value(value: Option<&serde_json::Value>) -> RecordContent {
    match value {
        Some(serde_json::Value::String(s)) => RecordContent::Text(s.clone()),
        Some(serde_json::Value::Array(items)) => RecordContent::Blocks(
            items
                .iter()
                .map(|item| {
                    serde_json::from_value::<RawBlock>(item.clone())
                        .map(ContentBlock::from)
                        .unwrap_or(ContentBlock::Unknown)
                })
                .collect(),
        ),
        _ => RecordContent::Other,
    }
}

/// Parse a role string; anything but `user`/`assistant` is metadata.
pub(crate) fn role_from_str(role: Option<&str>) -> Option<Role> {
    role.and_then(|r| r.parse().ok())
}

// ============================================
// Pending tool map
// ============================================

/// Tool invocations whose result has not been seen yet (id → tool name).
///
/// Owned by the caller and threaded through successive [`parse_entries`] calls.
/// Serializes as a plain `{id: name}` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PendingToolMap {
    tools: HashMap<String, String>,
}

impl PendingToolMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an emitted invocation.
    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.tools.insert(id.into(), name.into());
    }

    /// Resolve an invocation. Absent ids are a no-op returning `None`.
    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.tools.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.tools.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tools.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ============================================
// Content extraction
// ============================================

/// Result of walking one record's payload.
#[derive(Debug, Default)]
struct Extracted {
    text: String,
    thinking: String,
    content_type: ContentType,
    /// First invocation registered by this record
    tool_use: Option<(String, String)>,
    /// Last result resolved by this record, with the name if it was pending
    tool_result: Option<(String, Option<String>)>,
    /// Every id this record registered
    registered: Vec<String>,
}

/// Walk a payload, updating `pending` for tool blocks.
///
/// Text blocks are concatenated in order. Content type follows the block
/// order: the last tool block seen decides between `tool_use` and
/// `tool_result`.
fn extract(content: &RecordContent, pending: &mut PendingToolMap) -> Extracted {
    let mut out = Extracted::default();

    let blocks = match content {
        RecordContent::Text(text) => {
            out.text = text.clone();
            return out;
        }
        RecordContent::Blocks(blocks) => blocks,
        RecordContent::Other => return out,
    };

    for block in blocks {
        match block {
            ContentBlock::Text { text } => out.text.push_str(text),
            ContentBlock::Thinking { thinking } => out.thinking.push_str(thinking),
            ContentBlock::ToolUse { id, name } => {
                if let Some(id) = id {
                    pending.insert(id.clone(), name.clone());
                    out.registered.push(id.clone());
                    if out.tool_use.is_none() {
                        out.tool_use = Some((id.clone(), name.clone()));
                    }
                    out.content_type = ContentType::ToolUse;
                }
            }
            ContentBlock::ToolResult { tool_use_id } => {
                if let Some(id) = tool_use_id {
                    let name = pending.remove(id);
                    out.tool_result = Some((id.clone(), name));
                }
                out.content_type = ContentType::ToolResult;
            }
            ContentBlock::Unknown => {}
        }
    }

    out
}

/// Concatenated text of a record, ignoring tools.
pub fn record_text(record: &LogRecord) -> String {
    match &record.content {
        RecordContent::Text(text) => text.clone(),
        RecordContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect(),
        RecordContent::Other => String::new(),
    }
}

// ============================================
// Local slash commands
// ============================================

/// Return the text between `open` and `close`, if both are present.
fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text[start..].find(close)? + start;
    Some(&text[start..end])
}

/// Render a local slash-command record, if `text` is one.
///
/// Agents log locally-handled commands as wrapped user text:
/// `<command-name>/model</command-name><command-args>opus</command-args>` for
/// the invocation and `<local-command-stdout>...</local-command-stdout>` for
/// its output.
pub fn local_command_text(text: &str) -> Option<String> {
    if let Some(stdout) = between(text, "<local-command-stdout>", "</local-command-stdout>") {
        return Some(stdout.trim().to_string());
    }

    let name = between(text, "<command-name>", "</command-name>")?.trim();
    let args = between(text, "<command-args>", "</command-args>")
        .map(str::trim)
        .unwrap_or("");
    if args.is_empty() {
        Some(name.to_string())
    } else {
        Some(format!("{} {}", name, args))
    }
}

/// Detect system-injected context sent with the `user` role.
///
/// These records carry CLI or environment context rather than anything a
/// person typed.
pub fn is_system_injected_context(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("<environment_context>")
        || trimmed.starts_with("<user_shell_command>")
        || trimmed.starts_with("<INSTRUCTIONS>")
        || trimmed.starts_with("<user_instructions>")
        || trimmed.starts_with("<system")
        || trimmed.starts_with("<local-command-caveat>")
        || trimmed.starts_with("# AGENTS.md instructions for")
}

// ============================================
// Batch parsing
// ============================================

struct Draft {
    message: AgentMessage,
    registered: Vec<String>,
}

/// Convert a batch of records into messages, threading tool state.
///
/// Only `user`/`assistant` records contribute. A record yields at most one
/// message and only when it has non-empty text (or, lacking text, non-empty
/// thinking). Tool blocks update `pending` whether or not a message is emitted.
///
/// A `tool_use` message is marked incomplete while any invocation it
/// registered is still pending at the end of the batch.
pub fn parse_entries(
    records: &[LogRecord],
    mut pending: PendingToolMap,
) -> (Vec<AgentMessage>, PendingToolMap) {
    let mut drafts: Vec<Draft> = Vec::new();

    for record in records {
        let Some(role) = record.role else {
            continue;
        };

        let extracted = extract(&record.content, &mut pending);

        if role == Role::User {
            if let Some(command) = local_command_text(&extracted.text) {
                if !command.is_empty() {
                    drafts.push(Draft {
                        message: AgentMessage {
                            text: command,
                            role,
                            content_type: ContentType::LocalCommand,
                            is_complete: true,
                            tool_use_id: None,
                            tool_name: None,
                            timestamp: record.timestamp.clone(),
                        },
                        registered: Vec::new(),
                    });
                }
                continue;
            }
        }

        let (text, content_type) = if !extracted.text.is_empty() {
            (extracted.text, extracted.content_type)
        } else if !extracted.thinking.is_empty() {
            (extracted.thinking, ContentType::Thinking)
        } else {
            continue;
        };

        let (tool_use_id, tool_name) = match content_type {
            ContentType::ToolUse => extracted
                .tool_use
                .map(|(id, name)| (Some(id), Some(name)))
                .unwrap_or((None, None)),
            ContentType::ToolResult => extracted
                .tool_result
                .map(|(id, name)| (Some(id), name))
                .unwrap_or((None, None)),
            _ => (None, None),
        };

        drafts.push(Draft {
            message: AgentMessage {
                text,
                role,
                content_type,
                is_complete: true,
                tool_use_id,
                tool_name,
                timestamp: record.timestamp.clone(),
            },
            registered: if content_type == ContentType::ToolUse {
                extracted.registered
            } else {
                Vec::new()
            },
        });
    }

    let messages = drafts
        .into_iter()
        .map(|draft| {
            let mut message = draft.message;
            message.is_complete = !draft.registered.iter().any(|id| pending.contains(id));
            message
        })
        .collect();

    (messages, pending)
}

/// Single-record variant used for history display.
///
/// Same text concatenation as [`parse_entries`] with no tool tracking; every
/// message is plain text.
pub fn parse_history_entry(record: &LogRecord) -> Option<AgentMessage> {
    let role = record.role?;
    let text = record_text(record);
    if text.is_empty() {
        return None;
    }
    let mut message = AgentMessage::text(role, text);
    message.timestamp = record.timestamp.clone();
    Some(message)
}

/// True when the record is a turn a person actually typed.
pub fn is_human_turn(record: &LogRecord) -> bool {
    if record.role != Some(Role::User) || record.is_meta || record.has_tool_result() {
        return false;
    }
    let text = record_text(record);
    !text.trim().is_empty()
        && local_command_text(&text).is_none()
        && !is_system_injected_context(&text)
}
