//! Gemini CLI backend
//!
//! ```text
//! gemini                      fresh session
//! gemini --resume <id>        resume a saved session
//! gemini --resume latest      most recent session
//! ```
//!
//! Gemini writes no line-oriented transcript we can tail, so all observation
//! goes through the screen.

use super::{AgentProvider, LaunchMode, ProviderCapabilities, TranscriptFormat};
use crate::error::Result;
use crate::transcript::LogRecord;

pub const CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    name: "gemini",
    launch_command: "gemini",
    supports_hook: false,
    supports_resume: true,
    supports_continue: true,
    supports_structured_transcript: false,
    transcript_format: TranscriptFormat::None,
    interactive_layouts: &[],
    builtin_commands: &[
        "about",
        "auth",
        "chat",
        "clear",
        "compress",
        "copy",
        "docs",
        "editor",
        "extensions",
        "help",
        "memory",
        "quit",
        "restore",
        "settings",
        "stats",
        "theme",
        "tools",
    ],
};

/// Adapter for the Gemini CLI.
#[derive(Debug, Default)]
pub struct GeminiProvider;

impl GeminiProvider {
    pub fn new() -> Self {
        Self
    }
}

impl AgentProvider for GeminiProvider {
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
                LaunchMode::Continue => vec!["--resume".to_string(), "latest".to_string()],
            },
        )
    }

    fn parse_log_line(&self, _line: &str) -> Option<LogRecord> {
        None
    }
}
