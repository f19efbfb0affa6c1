//! # panerelay-core
//!
//! Core library for panerelay - relays coding-agent sessions running in
//! terminal panes to chat threads.
//!
//! This library provides:
//! - Transcript parsing for Claude Code and Codex JSONL logs
//! - Terminal screen parsing (spinner status, interactive prompts)
//! - Pluggable agent providers with declared capabilities
//! - Incremental transcript tailing with persisted byte offsets
//! - SQLite state for thread bindings, notification modes and directories
//! - Configuration and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use panerelay_core::{Config, ProviderRegistry, SessionTailer};
//!
//! let config = Config::load().expect("failed to load config");
//! let registry = ProviderRegistry::with_builtin();
//! config.validate(&registry).expect("invalid config");
//!
//! let db = config.open_database().expect("failed to open database");
//!
//! let mut tailer = SessionTailer::load(Arc::new(db), config.tailer.write_mode)
//!     .expect("failed to load tracked sessions");
//! tailer
//!     .track_new("session-id", "/path/to/session-id.jsonl", config.tailer.start_at_end)
//!     .expect("failed to track transcript");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use ingest::{decode_batch, SessionTailer, TailBatch, WriteMode};
pub use provider::{AgentProvider, ProviderRegistry};
pub use transcript::PendingToolMap;
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod provider;
pub mod screen;
pub mod transcript;
pub mod types;
