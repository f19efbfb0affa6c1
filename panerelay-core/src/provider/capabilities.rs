//! Static provider capability descriptors and the policy queries over them.

use serde::Serialize;

/// On-disk shape of a provider's session transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptFormat {
    /// One JSON record per line
    Jsonl,
    /// No machine-readable transcript; only the screen can be observed
    None,
}

impl TranscriptFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptFormat::Jsonl => "jsonl",
            TranscriptFormat::None => "none",
        }
    }
}

impl std::fmt::Display for TranscriptFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a provider backend can do. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderCapabilities {
    /// Registry name (`claude`, `codex`, ...)
    pub name: &'static str,
    /// Executable launched in the pane
    pub launch_command: &'static str,
    /// CLI can run a session-start hook that reports its session id
    pub supports_hook: bool,
    pub supports_resume: bool,
    pub supports_continue: bool,
    pub supports_structured_transcript: bool,
    pub transcript_format: TranscriptFormat,
    /// Interactive layouts this CLI renders
    pub interactive_layouts: &'static [&'static str],
    /// Slash commands handled by the CLI itself, without the leading `/`
    pub builtin_commands: &'static [&'static str],
}

/// Answers capability questions for one provider.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityPolicy {
    caps: ProviderCapabilities,
}

impl CapabilityPolicy {
    pub fn new(caps: ProviderCapabilities) -> Self {
        Self { caps }
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        &self.caps
    }

    pub fn can_hook(&self) -> bool {
        self.caps.supports_hook
    }

    pub fn can_resume(&self) -> bool {
        self.caps.supports_resume
    }

    pub fn can_continue(&self) -> bool {
        self.caps.supports_continue
    }

    pub fn has_structured_transcript(&self) -> bool {
        self.caps.supports_structured_transcript
            && self.caps.transcript_format != TranscriptFormat::None
    }

    pub fn supports_layout(&self, name: &str) -> bool {
        self.caps.interactive_layouts.contains(&name)
    }

    /// Accepts `model` or `/model`.
    pub fn supports_builtin_command(&self, name: &str) -> bool {
        let name = name.trim();
        let name = name.strip_prefix('/').unwrap_or(name);
        self.caps.builtin_commands.contains(&name)
    }
}

impl From<ProviderCapabilities> for CapabilityPolicy {
    fn from(caps: ProviderCapabilities) -> Self {
        Self::new(caps)
    }
}
