//! Transcript ingestion
//!
//! ```text
//! ┌─────────────────┐     ┌───────────────┐     ┌──────────────────┐
//! │ Transcript file │ ──► │ SessionTailer │ ──► │  AgentProvider   │ ──► AgentMessage
//! │ (append-only)   │     │ (offsets)     │     │  (line → record) │
//! └─────────────────┘     └───────────────┘     └──────────────────┘
//!                                │
//!                                ▼
//!                     tracked_sessions (SQLite)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use panerelay_core::ingest::{decode_batch, SessionTailer, WriteMode};
//!
//! let mut tailer = SessionTailer::load(db, WriteMode::WriteThrough)?;
//! let mut pending = PendingToolMap::new();
//! let batch = tailer.poll(&session_id)?;
//! let (messages, next) = decode_batch(provider.as_ref(), &batch, pending);
//! pending = next;
//! ```

pub mod tailer;

pub use tailer::{PollOutcome, SessionTailer, TailBatch, WriteMode};

use crate::provider::AgentProvider;
use crate::transcript::{LogRecord, PendingToolMap};
use crate::types::AgentMessage;

/// Decode a batch's lines with `provider` and convert them to messages.
///
/// After a truncation the batch replays the file from the start, so the
/// pending map is rebuilt from scratch rather than carried over.
pub fn decode_batch(
    provider: &dyn AgentProvider,
    batch: &TailBatch,
    pending: PendingToolMap,
) -> (Vec<AgentMessage>, PendingToolMap) {
    let pending = if batch.outcome == PollOutcome::Truncated && !pending.is_empty() {
        tracing::debug!(
            session_id = %batch.session_id,
            dropped = pending.len(),
            "Discarding pending tools after truncation"
        );
        PendingToolMap::new()
    } else {
        pending
    };

    let records: Vec<LogRecord> = batch
        .lines
        .iter()
        .filter_map(|line| provider.parse_log_line(line))
        .collect();

    provider.parse_log_batch(&records, pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ClaudeProvider;
    use crate::types::{ContentType, Role};

    fn batch(lines: &[&str], outcome: PollOutcome) -> TailBatch {
        TailBatch {
            session_id: "s".to_string(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            from_offset: 0,
            to_offset: 0,
            outcome,
        }
    }

    #[test]
    fn test_decode_claude_batch() {
        let provider = ClaudeProvider::new();
        let lines = [
            r#"{"type":"user","message":{"role":"user","content":"List files"}}"#,
            "not json",
            r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"Running ls"},{"type":"tool_use","id":"t1","name":"Bash","input":{}}]}}"#,
        ];

        let (messages, pending) =
            decode_batch(&provider, &batch(&lines, PollOutcome::Read), PendingToolMap::new());

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].content_type, ContentType::ToolUse);
        assert!(!messages[1].is_complete);
        assert_eq!(pending.get("t1"), Some("Bash"));
    }

    #[test]
    fn test_truncation_resets_pending() {
        let provider = ClaudeProvider::new();
        let mut pending = PendingToolMap::new();
        pending.insert("stale", "Read");

        let (_, pending) = decode_batch(&provider, &batch(&[], PollOutcome::Truncated), pending);
        assert!(pending.is_empty());
    }
}
