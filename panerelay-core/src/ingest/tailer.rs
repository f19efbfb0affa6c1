//! Incremental transcript reader
//!
//! Keeps one byte offset per tracked session and, on each poll, returns the
//! complete lines appended since the previous poll.
//!
//! ## Offset recovery
//!
//! | Condition | Action |
//! |-----------|--------|
//! | offset > file size | file was truncated or rotated; restart at 0 |
//! | bytes before offset differ from the last poll | file was rewritten or replaced; restart at 0 |
//! | byte before offset is not `\n` | offset points into a record; skip to the next line boundary and return nothing this poll |
//! | trailing bytes without `\n` | record still being written; left for the next poll |
//! | line is not valid UTF-8 | skipped with a warning |
//! | file missing | empty batch, offset untouched |
//!
//! The stored offset always sits on a line boundary after a successful poll,
//! and is updated only as the last step of that poll.
//!
//! Rewrite detection compares the tail of the last consumed line with what
//! the file holds at the same position now. The tail is kept in memory only,
//! so the first poll after a restart relies on the size check alone.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::TrackedSession;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// When offset changes reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Persist every offset change as it happens
    #[default]
    WriteThrough,
    /// Mark sessions dirty; persist on [`SessionTailer::flush`]
    Deferred,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::WriteThrough => "write_through",
            WriteMode::Deferred => "deferred",
        }
    }
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes before the stored offset remembered for rewrite detection.
const ANCHOR_LEN: u64 = 64;

/// What a poll found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    /// Read from the stored offset (possibly zero new lines)
    Read,
    /// Offset exceeded the file size, or the file was rewritten; read again
    /// from the start
    Truncated,
    /// Offset was inside a record; moved to the next line boundary
    Resynced,
    /// Transcript file does not exist (yet)
    Missing,
}

/// Lines returned by one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TailBatch {
    pub session_id: String,
    pub lines: Vec<String>,
    /// Offset the read started from (0 after truncation)
    pub from_offset: u64,
    /// Stored offset after this poll
    pub to_offset: u64,
    pub outcome: PollOutcome,
}

impl TailBatch {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Result of scanning a file from an offset, before anything is stored.
#[derive(Debug)]
struct Scan {
    lines: Vec<String>,
    from_offset: u64,
    new_offset: u64,
    outcome: PollOutcome,
}

/// Read complete lines from `file` starting at `offset`.
fn scan(file: &mut File, offset: u64, session_id: &str) -> std::io::Result<Scan> {
    let file_size = file.metadata()?.len();

    let (start, outcome) = if offset > file_size {
        tracing::warn!(
            session_id,
            offset,
            file_size,
            "Transcript truncated, restarting from beginning"
        );
        (0, PollOutcome::Truncated)
    } else {
        (offset, PollOutcome::Read)
    };

    if start > 0 {
        file.seek(SeekFrom::Start(start - 1))?;
        let mut prev = [0u8; 1];
        file.read_exact(&mut prev)?;

        if prev[0] != b'\n' {
            // Offset points into a record; the rest of that record is unusable
            let mut reader = BufReader::new(&mut *file);
            let mut skipped = Vec::new();
            let n = reader.read_until(b'\n', &mut skipped)? as u64;

            let new_offset = if skipped.last() == Some(&b'\n') {
                start + n
            } else {
                start
            };
            tracing::warn!(
                session_id,
                offset = start,
                new_offset,
                "Offset inside a record, resyncing to next line boundary"
            );
            return Ok(Scan {
                lines: Vec::new(),
                from_offset: start,
                new_offset,
                outcome: PollOutcome::Resynced,
            });
        }
    }

    file.seek(SeekFrom::Start(start))?;
    let mut reader = BufReader::new(&mut *file);
    let mut current_offset = start;
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        if buf.last() != Some(&b'\n') {
            // Incomplete trailing line
            break;
        }

        let line_offset = current_offset;
        current_offset += n as u64;

        let content = buf
            .strip_suffix(b"\n")
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .unwrap_or(&buf[..]);
        match std::str::from_utf8(content) {
            Ok(line) => lines.push(line.to_string()),
            Err(e) => {
                tracing::warn!(session_id, offset = line_offset, error = %e, "Skipping non-UTF-8 line");
            }
        }
    }

    Ok(Scan {
        lines,
        from_offset: start,
        new_offset: current_offset,
        outcome,
    })
}

/// Up to [`ANCHOR_LEN`] bytes ending at `offset`.
fn read_anchor(file: &mut File, offset: u64) -> std::io::Result<Vec<u8>> {
    let start = offset.saturating_sub(ANCHOR_LEN);
    let mut anchor = vec![0u8; (offset - start) as usize];
    file.seek(SeekFrom::Start(start))?;
    file.read_exact(&mut anchor)?;
    Ok(anchor)
}

/// True if the bytes ending at `offset` no longer match `anchor`.
///
/// A file shorter than `offset` is left to the truncation check in [`scan`].
fn is_rewritten(file: &mut File, offset: u64, anchor: &[u8]) -> std::io::Result<bool> {
    if offset == 0 || offset > file.metadata()?.len() {
        return Ok(false);
    }
    Ok(read_anchor(file, offset)? != anchor)
}

/// Position just after the last complete line of `path`, or 0 if missing.
fn end_of_last_line(path: &Path) -> Result<u64> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let size = file.metadata()?.len();
    let mut end = size;
    let mut chunk = vec![0u8; 8192];

    while end > 0 {
        let start = end.saturating_sub(chunk.len() as u64);
        let len = (end - start) as usize;
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut chunk[..len])?;
        if let Some(i) = chunk[..len].iter().rposition(|&b| b == b'\n') {
            return Ok(start + i as u64 + 1);
        }
        end = start;
    }
    Ok(0)
}

/// Tails every tracked session's transcript.
///
/// One tailer owns its sessions' offsets; `poll` takes `&mut self`, so polls
/// through one tailer never overlap.
pub struct SessionTailer {
    db: Arc<Database>,
    mode: WriteMode,
    sessions: HashMap<String, TrackedSession>,
    dirty: BTreeSet<String>,
    anchors: HashMap<String, Vec<u8>>,
}

impl SessionTailer {
    /// Create a tailer with no sessions loaded.
    pub fn new(db: Arc<Database>, mode: WriteMode) -> Self {
        Self {
            db,
            mode,
            sessions: HashMap::new(),
            dirty: BTreeSet::new(),
            anchors: HashMap::new(),
        }
    }

    /// Create a tailer and load every persisted session.
    pub fn load(db: Arc<Database>, mode: WriteMode) -> Result<Self> {
        let mut tailer = Self::new(db, mode);
        for session in tailer.db.list_tracked_sessions()? {
            tailer.sessions.insert(session.session_id.clone(), session);
        }
        tracing::info!(
            sessions = tailer.sessions.len(),
            mode = %mode,
            "Loaded tracked sessions"
        );
        Ok(tailer)
    }

    pub fn write_mode(&self) -> WriteMode {
        self.mode
    }

    /// Start tracking a transcript from its beginning.
    ///
    /// Re-tracking with the same path keeps the stored offset; a new path
    /// starts over at 0.
    pub fn track(&mut self, session_id: &str, file_path: impl Into<PathBuf>) -> Result<&TrackedSession> {
        self.track_at(session_id, file_path.into(), None)
    }

    /// Start tracking a transcript from its current end.
    ///
    /// History already in the file is not replayed.
    pub fn track_from_end(
        &mut self,
        session_id: &str,
        file_path: impl Into<PathBuf>,
    ) -> Result<&TrackedSession> {
        let file_path = file_path.into();
        let offset = end_of_last_line(&file_path)?;
        self.track_at(session_id, file_path, Some(offset))
    }

    /// Track a session, starting at the current end of its transcript when
    /// `start_at_end` is set. Already tracked sessions keep their offset.
    pub fn track_new(
        &mut self,
        session_id: &str,
        file_path: impl Into<PathBuf>,
        start_at_end: bool,
    ) -> Result<&TrackedSession> {
        if start_at_end {
            self.track_from_end(session_id, file_path)
        } else {
            self.track(session_id, file_path)
        }
    }

    fn track_at(
        &mut self,
        session_id: &str,
        file_path: PathBuf,
        initial_offset: Option<u64>,
    ) -> Result<&TrackedSession> {
        let session = match self.sessions.get(session_id) {
            Some(existing) if existing.file_path == file_path => existing.clone(),
            existing => {
                self.anchors.remove(session_id);
                if let Some(old) = existing {
                    tracing::info!(
                        session_id,
                        old = %old.file_path.display(),
                        new = %file_path.display(),
                        "Transcript path changed"
                    );
                }
                TrackedSession {
                    session_id: session_id.to_string(),
                    file_path,
                    last_byte_offset: initial_offset.unwrap_or(0),
                }
            }
        };

        // Creation is always persisted so the session survives a restart
        self.db.upsert_tracked_session(&session)?;
        self.dirty.remove(session_id);

        tracing::debug!(
            session_id,
            path = %session.file_path.display(),
            offset = session.last_byte_offset,
            "Tracking session"
        );
        self.sessions.insert(session_id.to_string(), session);
        self.sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotTracked(session_id.to_string()))
    }

    /// Stop tracking a session and delete its stored offset.
    pub fn untrack(&mut self, session_id: &str) -> Result<bool> {
        self.dirty.remove(session_id);
        self.anchors.remove(session_id);
        let known = self.sessions.remove(session_id).is_some();
        let stored = self.db.remove_tracked_session(session_id)?;
        Ok(known || stored)
    }

    pub fn session(&self, session_id: &str) -> Option<&TrackedSession> {
        self.sessions.get(session_id)
    }

    /// Tracked session ids, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// True if deferred offset changes are waiting for [`Self::flush`].
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Read lines appended since the last poll.
    pub fn poll(&mut self, session_id: &str) -> Result<TailBatch> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotTracked(session_id.to_string()))?;
        let offset = session.last_byte_offset;

        let mut file = match File::open(&session.file_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(session_id, path = %session.file_path.display(), "Transcript not found");
                return Ok(TailBatch {
                    session_id: session_id.to_string(),
                    lines: Vec::new(),
                    from_offset: offset,
                    to_offset: offset,
                    outcome: PollOutcome::Missing,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let rewritten = match self.anchors.get(session_id) {
            Some(anchor) => is_rewritten(&mut file, offset, anchor)?,
            None => false,
        };

        let scan = if rewritten {
            tracing::warn!(
                session_id,
                offset,
                "Transcript rewritten, restarting from beginning"
            );
            let mut scan = scan(&mut file, 0, session_id)?;
            scan.outcome = PollOutcome::Truncated;
            scan
        } else {
            scan(&mut file, offset, session_id)?
        };

        let stale_anchor =
            scan.new_offset != offset || rewritten || !self.anchors.contains_key(session_id);
        if scan.new_offset > 0 && stale_anchor {
            match read_anchor(&mut file, scan.new_offset) {
                Ok(anchor) => {
                    self.anchors.insert(session_id.to_string(), anchor);
                }
                Err(e) => {
                    tracing::debug!(session_id, error = %e, "Could not read rewrite anchor");
                    self.anchors.remove(session_id);
                }
            }
        } else if scan.new_offset == 0 {
            self.anchors.remove(session_id);
        }

        if scan.new_offset != offset {
            self.set_offset(session_id, scan.new_offset)?;
        }

        if !scan.lines.is_empty() {
            tracing::trace!(
                session_id,
                lines = scan.lines.len(),
                from = scan.from_offset,
                to = scan.new_offset,
                "Read transcript lines"
            );
        }

        Ok(TailBatch {
            session_id: session_id.to_string(),
            lines: scan.lines,
            from_offset: scan.from_offset,
            to_offset: scan.new_offset,
            outcome: scan.outcome,
        })
    }

    /// Poll every tracked session, in id order.
    ///
    /// A failing session is logged and skipped; the others are still polled.
    pub fn poll_all(&mut self) -> Vec<TailBatch> {
        let mut batches = Vec::new();
        for session_id in self.session_ids() {
            match self.poll(&session_id) {
                Ok(batch) => batches.push(batch),
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "Failed to poll session");
                }
            }
        }
        batches
    }

    fn set_offset(&mut self, session_id: &str, offset: u64) -> Result<()> {
        let Some(session) = self.sessions.get(session_id) else {
            return Err(Error::SessionNotTracked(session_id.to_string()));
        };

        let mut updated = session.clone();
        updated.last_byte_offset = offset;

        match self.mode {
            WriteMode::WriteThrough => self.db.upsert_tracked_session(&updated)?,
            WriteMode::Deferred => {
                self.dirty.insert(session_id.to_string());
            }
        }

        self.sessions.insert(session_id.to_string(), updated);
        Ok(())
    }

    /// Persist all deferred offset changes in one transaction.
    ///
    /// Returns the number of sessions written; nothing is written when no
    /// session is dirty.
    pub fn flush(&mut self) -> Result<usize> {
        if self.dirty.is_empty() {
            return Ok(0);
        }

        let pending: Vec<TrackedSession> = self
            .dirty
            .iter()
            .filter_map(|id| self.sessions.get(id).cloned())
            .collect();

        self.db.upsert_tracked_sessions(&pending)?;
        self.dirty.clear();

        tracing::debug!(sessions = pending.len(), "Flushed session offsets");
        Ok(pending.len())
    }
}
