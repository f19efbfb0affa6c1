//! Agent CLI backends
//!
//! Every supported CLI is an [`AgentProvider`]: a stateless adapter that knows
//! the CLI's launch syntax, where its transcripts live and which of the shared
//! parsers ([`crate::transcript`], [`crate::screen`]) apply to it.
//!
//! ## Supported Providers
//!
//! | Provider | Module | Transcript | Screen |
//! |----------|--------|------------|--------|
//! | Claude Code | [`claude`] | JSONL | layouts + spinner |
//! | Codex | [`codex`] | JSONL rollout | last line |
//! | Gemini CLI | [`gemini`] | none | last line |
//!
//! Adapters are obtained by name from a [`ProviderRegistry`].

pub mod capabilities;
pub mod claude;
pub mod codex;
pub mod gemini;
pub mod registry;

pub use capabilities::{CapabilityPolicy, ProviderCapabilities, TranscriptFormat};
pub use claude::ClaudeProvider;
pub use codex::CodexProvider;
pub use gemini::GeminiProvider;
pub use registry::ProviderRegistry;

use crate::error::{Error, Result};
use crate::transcript::{self, LogRecord, PendingToolMap};
use crate::types::{AgentMessage, StatusUpdate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Longest resume id accepted on a command line.
pub const MAX_RESUME_ID_LEN: usize = 128;

static RESUME_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("resume id pattern is valid"));

/// Check a session id before it is embedded in a launch command.
pub fn validate_resume_id(id: &str) -> Result<&str> {
    let reason = if id.is_empty() {
        "must not be empty".to_string()
    } else if id.len() > MAX_RESUME_ID_LEN {
        format!("longer than {} characters", MAX_RESUME_ID_LEN)
    } else if !RESUME_ID_RE.is_match(id) {
        "may only contain letters, digits, '.', '_' and '-'".to_string()
    } else {
        return Ok(id);
    };

    Err(Error::InvalidIdentifier {
        field: "resume_id",
        value: id.to_string(),
        reason,
    })
}

/// How a session should be started, after capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode<'a> {
    Fresh,
    /// Resume the session with this (validated) id
    Resume(&'a str),
    /// Resume the most recent session in the working directory
    Continue,
}

impl<'a> LaunchMode<'a> {
    /// Resolve the caller's request against `caps`.
    ///
    /// A resume id takes precedence over `continue_session`.
    pub fn resolve(
        caps: &ProviderCapabilities,
        resume_id: Option<&'a str>,
        continue_session: bool,
    ) -> Result<Self> {
        if let Some(id) = resume_id {
            if !caps.supports_resume {
                return Err(Error::Unsupported {
                    provider: caps.name.to_string(),
                    capability: "resume",
                });
            }
            if continue_session {
                tracing::debug!(provider = caps.name, "Both resume id and continue given, using resume id");
            }
            return Ok(LaunchMode::Resume(validate_resume_id(id)?));
        }

        if continue_session {
            if !caps.supports_continue {
                return Err(Error::Unsupported {
                    provider: caps.name.to_string(),
                    capability: "continue",
                });
            }
            return Ok(LaunchMode::Continue);
        }

        Ok(LaunchMode::Fresh)
    }
}

/// Trait implemented by every agent CLI backend.
///
/// Only [`capabilities`](Self::capabilities),
/// [`build_launch_args`](Self::build_launch_args) and
/// [`parse_log_line`](Self::parse_log_line) are backend specific; the rest
/// default to the shared parsers.
pub trait AgentProvider: Send + Sync {
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Policy view over [`Self::capabilities`].
    fn policy(&self) -> CapabilityPolicy {
        CapabilityPolicy::new(*self.capabilities())
    }

    fn name(&self) -> &'static str {
        self.capabilities().name
    }

    /// Arguments (after the executable) for launching a session.
    fn build_launch_args(
        &self,
        resume_id: Option<&str>,
        continue_session: bool,
    ) -> Result<Vec<String>>;

    /// Full command line typed into the pane.
    ///
    /// Resume ids are validated, so no quoting is needed.
    fn launch_command(&self, resume_id: Option<&str>, continue_session: bool) -> Result<String> {
        let args = self.build_launch_args(resume_id, continue_session)?;
        let mut parts = vec![self.capabilities().launch_command.to_string()];
        parts.extend(args);
        Ok(parts.join(" "))
    }

    /// Decode one transcript line. `None` for anything unusable.
    fn parse_log_line(&self, line: &str) -> Option<LogRecord>;

    /// Convert decoded records into messages, threading the pending tool map.
    fn parse_log_batch(
        &self,
        records: &[LogRecord],
        pending: PendingToolMap,
    ) -> (Vec<AgentMessage>, PendingToolMap) {
        transcript::parse_entries(records, pending)
    }

    fn parse_history_entry(&self, record: &LogRecord) -> Option<AgentMessage> {
        transcript::parse_history_entry(record)
    }

    /// Classify a screen capture. Defaults to the last non-blank line.
    fn parse_screen(&self, text: &str) -> Option<StatusUpdate> {
        crate::screen::parse_fallback_status(text)
    }

    fn is_interactive_ui(&self, text: &str) -> bool {
        crate::screen::detect_interactive_among(text, self.capabilities().interactive_layouts)
            .is_some()
    }

    fn is_human_turn(&self, record: &LogRecord) -> bool {
        transcript::is_human_turn(record)
    }

    fn builtin_commands(&self) -> &'static [&'static str] {
        self.capabilities().builtin_commands
    }

    // ----------------------------------------
    // Transcript discovery
    // ----------------------------------------

    /// Directory under which this CLI writes transcripts.
    ///
    /// Returns `None` if the path cannot be determined (e.g., $HOME not set)
    /// or the provider has no transcript.
    fn transcript_root(&self) -> Option<PathBuf> {
        None
    }

    /// Glob patterns relative to [`Self::transcript_root`].
    fn transcript_patterns(&self) -> &'static [&'static str] {
        &[]
    }

    /// Filter applied to glob matches. Defaults to accepting everything.
    fn include_transcript(&self, _path: &Path) -> bool {
        true
    }

    /// Session id encoded in a transcript path.
    ///
    /// For most providers, this is the file stem.
    fn session_id_from_path(&self, path: &Path) -> Option<String> {
        path.file_stem()?.to_str().map(str::to_string)
    }

    /// All transcript files currently on disk, sorted by path.
    fn discover_transcripts(&self) -> Result<Vec<PathBuf>> {
        let Some(root) = self.transcript_root() else {
            return Ok(vec![]);
        };

        let mut files = Vec::new();
        for pattern in self.transcript_patterns() {
            let full_pattern = root.join(pattern);
            let pattern_str = full_pattern.to_string_lossy();

            let entries = glob::glob(&pattern_str).map_err(|e| {
                Error::Config(format!("invalid transcript pattern {:?}: {}", pattern, e))
            })?;
            files.extend(entries.flatten().filter(|p| self.include_transcript(p)));
        }

        files.sort();
        tracing::debug!(provider = self.name(), count = files.len(), "Discovered transcripts");
        Ok(files)
    }

    /// Transcript file for `session_id`, if one exists.
    fn find_transcript(&self, session_id: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .discover_transcripts()?
            .into_iter()
            .find(|p| self.session_id_from_path(p).as_deref() == Some(session_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_resume_id() {
        assert!(validate_resume_id("0f5c2a7e-1b2c-4d3e-8f9a-abcdef012345").is_ok());
        assert!(validate_resume_id("session_1.bak").is_ok());
        assert!(validate_resume_id(&"a".repeat(MAX_RESUME_ID_LEN)).is_ok());

        for bad in ["", "a b", "id;rm -rf", "$(whoami)", "ünï"] {
            match validate_resume_id(bad) {
                Err(Error::InvalidIdentifier { field, value, .. }) => {
                    assert_eq!(field, "resume_id");
                    assert_eq!(value, bad);
                }
                other => panic!("expected InvalidIdentifier for {:?}, got {:?}", bad, other),
            }
        }
        assert!(validate_resume_id(&"a".repeat(MAX_RESUME_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_launch_mode_precedence() {
        let caps = ClaudeProvider::new().capabilities().to_owned();
        assert_eq!(
            LaunchMode::resolve(&caps, Some("abc"), true).unwrap(),
            LaunchMode::Resume("abc")
        );
        assert_eq!(
            LaunchMode::resolve(&caps, None, true).unwrap(),
            LaunchMode::Continue
        );
        assert_eq!(
            LaunchMode::resolve(&caps, None, false).unwrap(),
            LaunchMode::Fresh
        );
    }

    #[test]
    fn test_launch_mode_unsupported() {
        let caps = ProviderCapabilities {
            supports_resume: false,
            supports_continue: false,
            ..*ClaudeProvider::new().capabilities()
        };
        match LaunchMode::resolve(&caps, Some("abc"), false) {
            Err(Error::Unsupported { capability, .. }) => assert_eq!(capability, "resume"),
            other => panic!("expected Unsupported, got {:?}", other),
        }
        match LaunchMode::resolve(&caps, None, true) {
            Err(Error::Unsupported { capability, .. }) => assert_eq!(capability, "continue"),
            other => panic!("expected Unsupported, got {:?}", other),
        }
    }
}
