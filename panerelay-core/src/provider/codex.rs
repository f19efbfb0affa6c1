//! OpenAI Codex CLI backend
//!
//! Resume is a subcommand rather than a flag:
//!
//! ```text
//! codex                       fresh session
//! codex resume <id>           resume a session by id
//! codex resume --last         most recent session
//! ```
//!
//! Transcripts: `~/.codex/sessions/YYYY/MM/DD/rollout-<timestamp>-<id>.jsonl`.

use super::{AgentProvider, LaunchMode, ProviderCapabilities, TranscriptFormat};
use crate::error::Result;
use crate::transcript::{self, LogRecord};
use std::path::{Path, PathBuf};

pub const CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    name: "codex",
    launch_command: "codex",
    supports_hook: false,
    supports_resume: true,
    supports_continue: true,
    supports_structured_transcript: true,
    transcript_format: TranscriptFormat::Jsonl,
    interactive_layouts: &[],
    builtin_commands: &[
        "approvals",
        "compact",
        "diff",
        "init",
        "mcp",
        "mention",
        "model",
        "new",
        "quit",
        "review",
        "status",
    ],
};

/// Adapter for the Codex CLI.
pub struct CodexProvider {
    root: Option<PathBuf>,
}

impl CodexProvider {
    /// Create an adapter with the default root path (~/.codex).
    pub fn new() -> Self {
        Self {
            root: dirs::home_dir().map(|h| h.join(".codex")),
        }
    }

    /// Create an adapter with a custom root path (for testing).
    pub fn with_root(root: PathBuf) -> Self {
        Self { root: Some(root) }
    }
}

impl Default for CodexProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentProvider for CodexProvider {
    fn capabilities(&self) -> &ProviderCapabilities {
        &CAPABILITIES
    }

    fn build_launch_args(
        &self,
        resume_id: Option<&str>,
        continue_session: bool,
    ) -> Result<Vec<String>> {
        Ok(
            match LaunchMode::resolve(&CAPABILITIES, resume_id, continue_session)? {
                LaunchMode::Fresh => vec![],
                LaunchMode::Resume(id) => vec!["resume".to_string(), id.to_string()],
                LaunchMode::Continue => vec!["resume".to_string(), "--last".to_string()],
            },
        )
    }

    fn parse_log_line(&self, line: &str) -> Option<LogRecord> {
        transcript::codex::parse_line(line)
    }

    fn transcript_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }

    fn transcript_patterns(&self) -> &'static [&'static str] {
        &["sessions/*/*/*/rollout-*.jsonl"]
    }

    /// The id is the UUID at the end of the file stem:
    /// `rollout-2025-11-24T19-33-35-019ab86e-1e83-75b0-b2d7-d335492e7026`.
    fn session_id_from_path(&self, path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        let parts: Vec<&str> = stem.split('-').collect();
        if parts.len() < 5 {
            return None;
        }

        let tail = &parts[parts.len() - 5..];
        let expected = [8, 4, 4, 4, 12];
        let is_uuid = tail
            .iter()
            .zip(expected)
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()));

        is_uuid.then(|| tail.join("-"))
    }
}
