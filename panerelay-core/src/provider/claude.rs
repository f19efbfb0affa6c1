//! Claude Code backend
//!
//! Launch syntax:
//!
//! ```text
//! claude                      fresh session
//! claude --resume <id>        resume a session by id
//! claude --continue           most recent session in the working directory
//! ```
//!
//! Transcripts: `~/.claude/projects/[encoded-path]/[session-id].jsonl`.
//! Subagent files (`agent-*.jsonl`) share the directory and are excluded from
//! discovery.

use super::{AgentProvider, LaunchMode, ProviderCapabilities, TranscriptFormat};
use crate::error::Result;
use crate::screen;
use crate::transcript::{self, LogRecord};
use crate::types::StatusUpdate;
use std::path::{Path, PathBuf};

pub const CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    name: "claude",
    launch_command: "claude",
    supports_hook: true,
    supports_resume: true,
    supports_continue: true,
    supports_structured_transcript: true,
    transcript_format: TranscriptFormat::Jsonl,
    interactive_layouts: &[
        "ExitPlanMode",
        "AskUserQuestion",
        "PermissionPrompt",
        "TrustFolder",
        "RestoreCheckpoint",
        "Settings",
    ],
    builtin_commands: &[
        "add-dir",
        "agents",
        "clear",
        "compact",
        "config",
        "context",
        "cost",
        "doctor",
        "export",
        "help",
        "hooks",
        "init",
        "mcp",
        "memory",
        "model",
        "permissions",
        "resume",
        "review",
        "rewind",
        "status",
        "todos",
        "usage",
    ],
};

/// Adapter for the Claude Code CLI.
pub struct ClaudeProvider {
    root: Option<PathBuf>,
}

impl ClaudeProvider {
    /// Create an adapter with the default root path (~/.claude).
    pub fn new() -> Self {
        Self {
            root: dirs::home_dir().map(|h| h.join(".claude")),
        }
    }

    /// Create an adapter with a custom root path (for testing).
    pub fn with_root(root: PathBuf) -> Self {
        Self { root: Some(root) }
    }
}

impl Default for ClaudeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentProvider for ClaudeProvider {
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
                LaunchMode::Resume(id) => vec!["--resume".to_string(), id.to_string()],
                LaunchMode::Continue => vec!["--continue".to_string()],
            },
        )
    }

    fn parse_log_line(&self, line: &str) -> Option<LogRecord> {
        transcript::claude::parse_line(line)
    }

    fn parse_screen(&self, text: &str) -> Option<StatusUpdate> {
        screen::parse_screen(text)
    }

    fn is_interactive_ui(&self, text: &str) -> bool {
        screen::is_interactive_ui(text)
    }

    fn transcript_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }

    fn transcript_patterns(&self) -> &'static [&'static str] {
        &["projects/*/*.jsonl"]
    }

    fn include_transcript(&self, path: &Path) -> bool {
        !is_agent_file(path)
    }
}

/// Subagent transcripts are named `agent-<id>.jsonl`.
fn is_agent_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.starts_with("agent-"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_launch_args() {
        let p = ClaudeProvider::new();
        assert!(p.build_launch_args(None, false).unwrap().is_empty());
        assert_eq!(
            p.build_launch_args(Some("abc-123"), false).unwrap(),
            vec!["--resume", "abc-123"]
        );
        assert_eq!(p.build_launch_args(None, true).unwrap(), vec!["--continue"]);
        assert_eq!(
            p.launch_command(Some("abc-123"), true).unwrap(),
            "claude --resume abc-123"
        );
    }

    #[test]
    fn test_launch_rejects_bad_id() {
        let p = ClaudeProvider::new();
        assert!(matches!(
            p.build_launch_args(Some("x; rm -rf ~"), false),
            Err(Error::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_screen_uses_layouts_and_spinner() {
        let p = ClaudeProvider::new();
        let status = p.parse_screen("✽ Compiling…\n").unwrap();
        assert_eq!(status.raw_text, "Compiling…");
        assert!(p.is_interactive_ui("Do you want to proceed?\n ❯ 1. Yes\nEsc to cancel\n"));
        // No fallback to the last line
        assert!(p.parse_screen("just output\n").is_none());
    }

    #[test]
    fn test_declares_every_layout() {
        assert_eq!(
            CAPABILITIES.interactive_layouts.to_vec(),
            screen::layouts::layout_names()
        );
    }

    #[test]
    fn test_discover_skips_agent_files() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("projects").join("-home-me-repo");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("abc.jsonl"), "").unwrap();
        fs::write(project.join("agent-1234.jsonl"), "").unwrap();
        fs::write(project.join("notes.txt"), "").unwrap();

        let p = ClaudeProvider::with_root(dir.path().to_path_buf());
        let files = p.discover_transcripts().unwrap();
        assert_eq!(files, vec![project.join("abc.jsonl")]);
        assert_eq!(
            p.find_transcript("abc").unwrap(),
            Some(project.join("abc.jsonl"))
        );
        assert_eq!(p.find_transcript("missing").unwrap(), None);
    }
}
