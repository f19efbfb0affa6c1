//! Persistent relay state
//!
//! SQLite storage with:
//! - Schema migrations
//! - Tracked-session byte offsets for the tailer
//! - Thread bindings, notification modes and per-user directories

pub mod repo;
pub mod schema;

pub use repo::{
    resolve_directory, BindingSnapshot, Database, DirectoryEntry, DirectoryLimits, SNAPSHOT_VERSION,
};
