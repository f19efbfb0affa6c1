//! Core domain types for panerelay
//!
//! These types are the normalized output of the observation pipeline. Every
//! provider backend, whatever its transcript shape or screen vocabulary,
//! produces the same [`AgentMessage`] and [`StatusUpdate`] values.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Session** | One running agent CLI instance, with one transcript file and one terminal pane |
//! | **Transcript** | The append-only JSONL log an agent writes for a session |
//! | **Thread** | A conversation thread in the chat front end, bound to at most one session |
//! | **Pending tool** | A tool invocation whose result has not been observed yet |
//! | **Interactive layout** | A recognizable modal prompt rendered in the terminal |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================
// Messages
// ============================================

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// Dominant content kind of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Text,
    Thinking,
    ToolUse,
    ToolResult,
    /// Output of a slash command the agent ran locally (not sent to the model)
    LocalCommand,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Thinking => "thinking",
            ContentType::ToolUse => "tool_use",
            ContentType::ToolResult => "tool_result",
            ContentType::LocalCommand => "local_command",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized message extracted from one transcript record.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Concatenated text content
    pub text: String,
    pub role: Role,
    pub content_type: ContentType,
    /// False for a tool call whose result has not arrived yet
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Timestamp string exactly as written by the agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl AgentMessage {
    /// A complete plain-text message with no tool linkage.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role,
            content_type: ContentType::Text,
            is_complete: true,
            tool_use_id: None,
            tool_name: None,
            timestamp: None,
        }
    }
}

// ============================================
// Screen status
// ============================================

/// Classification of one terminal screen capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Status text, or the whole modal span for interactive layouts
    pub raw_text: String,
    /// Short label suitable for a chat status line
    pub display_label: String,
    pub is_interactive: bool,
    /// Name of the matched interactive layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_type: Option<String>,
}

impl StatusUpdate {
    /// A normal (non-interactive) status line.
    pub fn status(raw_text: impl Into<String>, display_label: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            display_label: display_label.into(),
            is_interactive: false,
            ui_type: None,
        }
    }

    /// An interactive layout snapshot.
    pub fn interactive(ui_type: &str, label: &str, content: impl Into<String>) -> Self {
        Self {
            raw_text: content.into(),
            display_label: label.to_string(),
            is_interactive: true,
            ui_type: Some(ui_type.to_string()),
        }
    }
}

// ============================================
// Tracked sessions
// ============================================

/// A session whose transcript is being tailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSession {
    pub session_id: String,
    pub file_path: PathBuf,
    /// Byte offset of the first unread line
    pub last_byte_offset: u64,
}

impl TrackedSession {
    pub fn new(session_id: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            file_path: file_path.into(),
            last_byte_offset: 0,
        }
    }
}

// ============================================
// Bindings
// ============================================

/// How much of a session's activity gets relayed to its bound thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode {
    /// Every message and status change
    #[default]
    All,
    /// Only interactive prompts and the final assistant reply of a turn
    Important,
    /// Nothing is pushed; the thread can still be queried
    Muted,
}

impl NotificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationMode::All => "all",
            NotificationMode::Important => "important",
            NotificationMode::Muted => "muted",
        }
    }

    /// Next mode in the toggle cycle used by chat buttons.
    pub fn cycle(self) -> Self {
        match self {
            NotificationMode::All => NotificationMode::Important,
            NotificationMode::Important => NotificationMode::Muted,
            NotificationMode::Muted => NotificationMode::All,
        }
    }
}

impl std::fmt::Display for NotificationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(NotificationMode::All),
            "important" => Ok(NotificationMode::Important),
            "muted" => Ok(NotificationMode::Muted),
            _ => Err(format!("unknown notification mode: {}", s)),
        }
    }
}

/// Which per-user directory list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryList {
    Recent,
    Favorite,
}

impl DirectoryList {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectoryList::Recent => "recent",
            DirectoryList::Favorite => "favorite",
        }
    }
}

impl std::fmt::Display for DirectoryList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DirectoryList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recent" => Ok(DirectoryList::Recent),
            "favorite" => Ok(DirectoryList::Favorite),
            _ => Err(format!("unknown directory list: {}", s)),
        }
    }
}

/// A thread → session binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadBinding {
    pub thread_id: String,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_mode_roundtrip_and_cycle() {
        for mode in [
            NotificationMode::All,
            NotificationMode::Important,
            NotificationMode::Muted,
        ] {
            assert_eq!(mode.as_str().parse::<NotificationMode>().unwrap(), mode);
        }
        assert_eq!(NotificationMode::All.cycle(), NotificationMode::Important);
        assert_eq!(NotificationMode::Muted.cycle(), NotificationMode::All);
        assert!("loud".parse::<NotificationMode>().is_err());
    }

    #[test]
    fn test_message_serializes_snake_case() {
        let msg = AgentMessage::text(Role::Assistant, "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content_type"], "text");
        assert!(json.get("tool_name").is_none());
    }
}
