//! Provider lookup by name
//!
//! The registry is an ordinary value: build it once at startup, resolve the
//! configured provider, and pass the adapter to whatever needs it.

use super::{AgentProvider, ClaudeProvider, CodexProvider, GeminiProvider};
use crate::error::{Error, Result};

/// Builds a fresh adapter.
pub type ProviderConstructor = fn() -> Box<dyn AgentProvider>;

/// Maps provider names to adapter constructors.
pub struct ProviderRegistry {
    entries: Vec<(String, ProviderConstructor)>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// A registry with every built-in backend.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("claude", || Box::new(ClaudeProvider::new()));
        registry.register("codex", || Box::new(CodexProvider::new()));
        registry.register("gemini", || Box::new(GeminiProvider::new()));
        registry
    }

    /// Register a constructor, replacing any previous one under `name`.
    pub fn register(&mut self, name: impl Into<String>, constructor: ProviderConstructor) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = constructor,
            None => self.entries.push((name, constructor)),
        }
    }

    /// Construct the adapter registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn AgentProvider>> {
        let name = name.trim();
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, constructor)| constructor())
            .ok_or_else(|| Error::UnknownProvider {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
