//! Database repository layer
//!
//! Holds all persistent relay state: tracked-session offsets, thread bindings,
//! per-session notification modes and per-user directory lists. Every public
//! mutation is a single statement or a single transaction.

use crate::error::{Error, Result};
use crate::types::{DirectoryList, NotificationMode, ThreadBinding, TrackedSession};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// Format version written by [`Database::export_bindings`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// One entry of a per-user directory list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub user_id: String,
    pub list: DirectoryList,
    pub path: PathBuf,
}

/// Portable copy of the binding state.
///
/// Directories are listed most-recent-first within each (user, list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub bindings: Vec<ThreadBinding>,
    #[serde(default)]
    pub notification_modes: BTreeMap<String, NotificationMode>,
    #[serde(default)]
    pub directories: Vec<DirectoryEntry>,
}

/// Maximum entries kept per user in each directory list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryLimits {
    pub recent: usize,
    pub favorite: usize,
}

impl DirectoryLimits {
    pub fn for_list(&self, list: DirectoryList) -> usize {
        match list {
            DirectoryList::Recent => self.recent,
            DirectoryList::Favorite => self.favorite,
        }
    }
}

impl Default for DirectoryLimits {
    fn default() -> Self {
        Self {
            recent: 5,
            favorite: 10,
        }
    }
}

/// Database handle (single connection)
pub struct Database {
    conn: Mutex<Connection>,
    limits: DirectoryLimits,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        tracing::debug!(path = %path.display(), "Opened state database");
        Ok(Self {
            conn: Mutex::new(conn),
            limits: DirectoryLimits::default(),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
            limits: DirectoryLimits::default(),
        })
    }

    /// Replace the directory list bounds used by
    /// [`Self::touch_recent_directory`] and [`Self::add_favorite_directory`].
    pub fn with_directory_limits(mut self, limits: DirectoryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn directory_limits(&self) -> DirectoryLimits {
        self.limits
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // Tracked session operations
    // ============================================

    fn write_tracked_session(conn: &Connection, session: &TrackedSession) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO tracked_sessions (session_id, file_path, last_byte_offset, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(session_id) DO UPDATE SET
                file_path = excluded.file_path,
                last_byte_offset = excluded.last_byte_offset,
                updated_at = excluded.updated_at
            "#,
            params![
                session.session_id,
                session.file_path.to_string_lossy().to_string(),
                session.last_byte_offset as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Insert or update a tracked session
    pub fn upsert_tracked_session(&self, session: &TrackedSession) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::write_tracked_session(&conn, session)
    }

    /// Insert or update several tracked sessions in one transaction
    pub fn upsert_tracked_sessions(&self, sessions: &[TrackedSession]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for session in sessions {
            Self::write_tracked_session(&tx, session)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get a tracked session by ID
    pub fn get_tracked_session(&self, session_id: &str) -> Result<Option<TrackedSession>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT session_id, file_path, last_byte_offset FROM tracked_sessions WHERE session_id = ?",
            [session_id],
            Self::row_to_tracked_session,
        )
        .optional()
        .map_err(Error::from)
    }

    /// All tracked sessions, ordered by ID
    pub fn list_tracked_sessions(&self) -> Result<Vec<TrackedSession>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT session_id, file_path, last_byte_offset FROM tracked_sessions ORDER BY session_id",
        )?;
        let sessions = stmt
            .query_map([], Self::row_to_tracked_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Stop tracking a session. Returns false if it was not tracked.
    pub fn remove_tracked_session(&self, session_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM tracked_sessions WHERE session_id = ?",
            [session_id],
        )?;
        Ok(removed > 0)
    }

    fn row_to_tracked_session(row: &Row) -> rusqlite::Result<TrackedSession> {
        let file_path: String = row.get("file_path")?;
        let offset: i64 = row.get("last_byte_offset")?;
        Ok(TrackedSession {
            session_id: row.get("session_id")?,
            file_path: PathBuf::from(file_path),
            last_byte_offset: offset.max(0) as u64,
        })
    }

    /// Remove everything stored about a session: offset, bindings and mode.
    pub fn forget_session(&self, session_id: &str) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM tracked_sessions WHERE session_id = ?",
            [session_id],
        )?;
        let unbound = tx.execute(
            "DELETE FROM thread_bindings WHERE session_id = ?",
            [session_id],
        )?;
        tx.execute(
            "DELETE FROM session_preferences WHERE session_id = ?",
            [session_id],
        )?;
        tx.commit()?;

        tracing::info!(session_id, unbound, "Forgot session");
        Ok(())
    }

    // ============================================
    // Thread binding operations
    // ============================================

    /// Bind a thread to a session, replacing any previous binding of the thread
    pub fn bind_thread(&self, thread_id: &str, session_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO thread_bindings (thread_id, session_id, bound_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(thread_id) DO UPDATE SET
                session_id = excluded.session_id,
                bound_at = excluded.bound_at
            "#,
            params![thread_id, session_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Remove a thread's binding. Returns false if it was not bound.
    pub fn unbind_thread(&self, thread_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM thread_bindings WHERE thread_id = ?",
            [thread_id],
        )?;
        Ok(removed > 0)
    }

    /// Session bound to a thread
    pub fn session_for_thread(&self, thread_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT session_id FROM thread_bindings WHERE thread_id = ?",
            [thread_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    /// Threads bound to a session, oldest binding first
    pub fn threads_for_session(&self, session_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT thread_id FROM thread_bindings WHERE session_id = ? ORDER BY bound_at, thread_id",
        )?;
        let threads = stmt
            .query_map([session_id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(threads)
    }

    /// All bindings, ordered by thread ID
    pub fn list_bindings(&self) -> Result<Vec<ThreadBinding>> {
        let conn = self.conn.lock().unwrap();
        Self::read_bindings(&conn)
    }

    fn read_bindings(conn: &Connection) -> Result<Vec<ThreadBinding>> {
        let mut stmt =
            conn.prepare("SELECT thread_id, session_id FROM thread_bindings ORDER BY thread_id")?;
        let bindings = stmt
            .query_map([], |row| {
                Ok(ThreadBinding {
                    thread_id: row.get(0)?,
                    session_id: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bindings)
    }

    // ============================================
    // Notification preferences
    // ============================================

    fn write_notification_mode(
        conn: &Connection,
        session_id: &str,
        mode: NotificationMode,
    ) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO session_preferences (session_id, notification_mode, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
                notification_mode = excluded.notification_mode,
                updated_at = excluded.updated_at
            "#,
            params![session_id, mode.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn read_notification_mode(conn: &Connection, session_id: &str) -> Result<NotificationMode> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT notification_mode FROM session_preferences WHERE session_id = ?",
                [session_id],
                |r| r.get(0),
            )
            .optional()?;

        Ok(match stored {
            Some(s) => s.parse().unwrap_or_else(|e| {
                tracing::warn!(session_id, error = %e, "Invalid stored notification mode");
                NotificationMode::default()
            }),
            None => NotificationMode::default(),
        })
    }

    pub fn set_notification_mode(&self, session_id: &str, mode: NotificationMode) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::write_notification_mode(&conn, session_id, mode)
    }

    /// Stored mode, or the default for sessions never configured
    pub fn notification_mode(&self, session_id: &str) -> Result<NotificationMode> {
        let conn = self.conn.lock().unwrap();
        Self::read_notification_mode(&conn, session_id)
    }

    /// Advance to the next mode and return it
    pub fn cycle_notification_mode(&self, session_id: &str) -> Result<NotificationMode> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let next = Self::read_notification_mode(&tx, session_id)?.cycle();
        Self::write_notification_mode(&tx, session_id, next)?;
        tx.commit()?;
        Ok(next)
    }

    // ============================================
    // Per-user directories
    // ============================================

    /// Move `path` to the front of a user's list, evicting beyond `max`.
    ///
    /// The path is resolved to an absolute form first, so `./repo`, `~/repo`
    /// and `/home/me/repo` are one entry. Returns the resolved path.
    pub fn record_directory(
        &self,
        user_id: &str,
        list: DirectoryList,
        path: &Path,
        max: usize,
    ) -> Result<PathBuf> {
        let resolved = resolve_directory(path)?;
        let path_str = resolved.to_string_lossy().to_string();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(last_used), 0) + 1 FROM user_directories WHERE user_id = ?1 AND list = ?2",
            params![user_id, list.as_str()],
            |r| r.get(0),
        )?;

        tx.execute(
            r#"
            INSERT INTO user_directories (user_id, list, path, last_used, added_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, list, path) DO UPDATE SET
                last_used = excluded.last_used
            "#,
            params![user_id, list.as_str(), path_str, next, Utc::now().to_rfc3339()],
        )?;

        let evicted = tx.execute(
            r#"
            DELETE FROM user_directories
            WHERE user_id = ?1 AND list = ?2 AND path NOT IN (
                SELECT path FROM user_directories
                WHERE user_id = ?1 AND list = ?2
                ORDER BY last_used DESC
                LIMIT ?3
            )
            "#,
            params![user_id, list.as_str(), max as i64],
        )?;

        tx.commit()?;

        if evicted > 0 {
            tracing::debug!(user_id, list = %list, evicted, "Evicted old directories");
        }
        Ok(resolved)
    }

    /// Record a directory the user just worked in.
    pub fn touch_recent_directory(&self, user_id: &str, path: &Path) -> Result<PathBuf> {
        let max = self.limits.for_list(DirectoryList::Recent);
        self.record_directory(user_id, DirectoryList::Recent, path, max)
    }

    pub fn add_favorite_directory(&self, user_id: &str, path: &Path) -> Result<PathBuf> {
        let max = self.limits.for_list(DirectoryList::Favorite);
        self.record_directory(user_id, DirectoryList::Favorite, path, max)
    }

    /// Remove a directory from a list. Returns false if it was not present.
    pub fn remove_directory(&self, user_id: &str, list: DirectoryList, path: &Path) -> Result<bool> {
        let resolved = resolve_directory(path)?;
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM user_directories WHERE user_id = ?1 AND list = ?2 AND path = ?3",
            params![user_id, list.as_str(), resolved.to_string_lossy().to_string()],
        )?;
        Ok(removed > 0)
    }

    /// A user's list, most recent first
    pub fn directories(&self, user_id: &str, list: DirectoryList) -> Result<Vec<PathBuf>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT path FROM user_directories WHERE user_id = ?1 AND list = ?2 ORDER BY last_used DESC",
        )?;
        let paths = stmt
            .query_map(params![user_id, list.as_str()], |r| r.get::<_, String>(0))?
            .map(|r| r.map(PathBuf::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(paths)
    }

    // ============================================
    // Export / import
    // ============================================

    /// Read the binding state in one transaction
    pub fn snapshot(&self) -> Result<BindingSnapshot> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let bindings = Self::read_bindings(&tx)?;

        let notification_modes = {
            let mut stmt =
                tx.prepare("SELECT session_id, notification_mode FROM session_preferences")?;
            let rows = stmt
                .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .filter_map(|(session, mode)| {
                    mode.parse::<NotificationMode>().ok().map(|m| (session, m))
                })
                .collect()
        };

        let directories = {
            let mut stmt = tx.prepare(
                "SELECT user_id, list, path FROM user_directories ORDER BY user_id, list, last_used DESC",
            )?;
            let rows = stmt
                .query_map([], |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .filter_map(|(user_id, list, path)| {
                    Some(DirectoryEntry {
                        user_id,
                        list: list.parse::<DirectoryList>().ok()?,
                        path: PathBuf::from(path),
                    })
                })
                .collect()
        };

        tx.commit()?;

        Ok(BindingSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            bindings,
            notification_modes,
            directories,
        })
    }

    /// Replace the binding state with `snapshot` in one transaction.
    ///
    /// Tracked-session offsets are not part of a snapshot and are left alone.
    pub fn restore_snapshot(&self, snapshot: &BindingSnapshot) -> Result<()> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(Error::Config(format!(
                "binding snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute_batch(
            "
            DELETE FROM thread_bindings;
            DELETE FROM session_preferences;
            DELETE FROM user_directories;
            ",
        )?;

        for binding in &snapshot.bindings {
            tx.execute(
                "INSERT OR REPLACE INTO thread_bindings (thread_id, session_id, bound_at) VALUES (?1, ?2, ?3)",
                params![binding.thread_id, binding.session_id, now],
            )?;
        }

        for (session_id, mode) in &snapshot.notification_modes {
            Self::write_notification_mode(&tx, session_id, *mode)?;
        }

        // Entries are most-recent-first; a strictly decreasing counter keeps that order
        let total = snapshot.directories.len() as i64;
        for (i, entry) in snapshot.directories.iter().enumerate() {
            tx.execute(
                r#"
                INSERT OR IGNORE INTO user_directories (user_id, list, path, last_used, added_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    entry.user_id,
                    entry.list.as_str(),
                    entry.path.to_string_lossy().to_string(),
                    total - i as i64,
                    now,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Write a JSON snapshot atomically (write tmp, then rename).
    ///
    /// Returns the number of bindings written.
    pub fn export_bindings(&self, path: &Path) -> Result<usize> {
        let snapshot = self.snapshot()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&snapshot)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;

        tracing::info!(
            path = %path.display(),
            bindings = snapshot.bindings.len(),
            "Exported bindings"
        );
        Ok(snapshot.bindings.len())
    }

    /// Load a snapshot written by [`Self::export_bindings`].
    ///
    /// Returns the number of bindings loaded.
    pub fn import_bindings(&self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: BindingSnapshot = serde_json::from_str(&content)?;
        self.restore_snapshot(&snapshot)?;

        tracing::info!(
            path = %path.display(),
            bindings = snapshot.bindings.len(),
            "Imported bindings"
        );
        Ok(snapshot.bindings.len())
    }
}

/// Resolve a working directory to an absolute path.
///
/// Existing paths are canonicalized (symlinks resolved). Paths that do not
/// exist yet are made absolute against the current directory and cleaned of
/// `.` and `..` components. A leading `~` is expanded.
pub fn resolve_directory(path: &Path) -> Result<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => {
                return Err(Error::InvalidIdentifier {
                    field: "directory",
                    value: path.to_string_lossy().to_string(),
                    reason: "home directory is unknown".to_string(),
                })
            }
        },
        Err(_) => path.to_path_buf(),
    };

    if let Ok(canonical) = std::fs::canonicalize(&expanded) {
        return Ok(canonical);
    }

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_tracked_session_roundtrip() {
        let db = test_db();
        let mut session = TrackedSession::new("s1", "/tmp/s1.jsonl");
        db.upsert_tracked_session(&session).unwrap();

        session.last_byte_offset = 4096;
        db.upsert_tracked_session(&session).unwrap();

        let loaded = db.get_tracked_session("s1").unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(db.get_tracked_session("nope").unwrap().is_none());
    }

    #[test]
    fn test_bulk_upsert_and_remove() {
        let db = test_db();
        let sessions = vec![
            TrackedSession::new("b", "/tmp/b.jsonl"),
            TrackedSession::new("a", "/tmp/a.jsonl"),
        ];
        db.upsert_tracked_sessions(&sessions).unwrap();

        let listed = db.list_tracked_sessions().unwrap();
        assert_eq!(
            listed.iter().map(|s| s.session_id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        assert!(db.remove_tracked_session("a").unwrap());
        assert!(!db.remove_tracked_session("a").unwrap());
        assert_eq!(db.list_tracked_sessions().unwrap().len(), 1);
    }

    #[test]
    fn test_rebinding_a_thread_replaces() {
        let db = test_db();
        db.bind_thread("t1", "s1").unwrap();
        db.bind_thread("t1", "s2").unwrap();
        db.bind_thread("t2", "s2").unwrap();

        assert_eq!(db.session_for_thread("t1").unwrap().as_deref(), Some("s2"));
        assert!(db.threads_for_session("s1").unwrap().is_empty());
        assert_eq!(db.threads_for_session("s2").unwrap().len(), 2);

        assert!(db.unbind_thread("t1").unwrap());
        assert!(db.session_for_thread("t1").unwrap().is_none());
        assert_eq!(db.list_bindings().unwrap().len(), 1);
    }

    #[test]
    fn test_notification_mode_default_and_cycle() {
        let db = test_db();
        assert_eq!(db.notification_mode("s1").unwrap(), NotificationMode::All);

        assert_eq!(
            db.cycle_notification_mode("s1").unwrap(),
            NotificationMode::Important
        );
        db.set_notification_mode("s1", NotificationMode::Muted).unwrap();
        assert_eq!(db.notification_mode("s1").unwrap(), NotificationMode::Muted);
        assert_eq!(db.cycle_notification_mode("s1").unwrap(), NotificationMode::All);
    }

    #[test]
    fn test_forget_session() {
        let db = test_db();
        db.upsert_tracked_session(&TrackedSession::new("s1", "/tmp/s1.jsonl"))
            .unwrap();
        db.bind_thread("t1", "s1").unwrap();
        db.set_notification_mode("s1", NotificationMode::Muted).unwrap();

        db.forget_session("s1").unwrap();

        assert!(db.get_tracked_session("s1").unwrap().is_none());
        assert!(db.session_for_thread("t1").unwrap().is_none());
        assert_eq!(db.notification_mode("s1").unwrap(), NotificationMode::All);
    }

    #[test]
    fn test_recent_directories_bounded_and_deduplicated() {
        let db = test_db().with_directory_limits(DirectoryLimits {
            recent: 3,
            favorite: 1,
        });
        let dir = TempDir::new().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        for name in ["a", "b", "c", "d"] {
            std::fs::create_dir(root.join(name)).unwrap();
        }

        db.touch_recent_directory("u1", &root.join("a")).unwrap();
        db.touch_recent_directory("u1", &root.join("b")).unwrap();
        db.touch_recent_directory("u1", &root.join("c")).unwrap();
        // Same directory via a different spelling moves to the front
        db.touch_recent_directory("u1", &root.join("b/../a/.")).unwrap();
        db.touch_recent_directory("u1", &root.join("d")).unwrap();

        assert_eq!(
            db.directories("u1", DirectoryList::Recent).unwrap(),
            vec![root.join("d"), root.join("a"), root.join("c")]
        );
        assert!(db.directories("u2", DirectoryList::Recent).unwrap().is_empty());
        assert!(db.directories("u1", DirectoryList::Favorite).unwrap().is_empty());

        db.add_favorite_directory("u1", &root.join("a")).unwrap();
        db.add_favorite_directory("u1", &root.join("b")).unwrap();
        assert_eq!(
            db.directories("u1", DirectoryList::Favorite).unwrap(),
            vec![root.join("b")]
        );
    }

    #[test]
    fn test_favorites_independent_of_recent() {
        let db = test_db();
        let dir = TempDir::new().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();

        db.touch_recent_directory("u1", &root).unwrap();
        db.add_favorite_directory("u1", &root).unwrap();
        assert!(db
            .remove_directory("u1", DirectoryList::Favorite, &root)
            .unwrap());
        assert_eq!(db.directories("u1", DirectoryList::Recent).unwrap(), vec![root]);
    }

    #[test]
    fn test_resolve_missing_directory_lexically() {
        let resolved = resolve_directory(Path::new("/no/such/./dir/../place")).unwrap();
        assert_eq!(resolved, PathBuf::from("/no/such/place"));

        let relative = resolve_directory(Path::new("not-a-real-dir-xyz")).unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("not-a-real-dir-xyz"));
    }

    #[test]
    fn test_export_import_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exports").join("bindings.json");

        let db = test_db();
        db.bind_thread("t1", "s1").unwrap();
        db.bind_thread("t2", "s2").unwrap();
        db.set_notification_mode("s1", NotificationMode::Important)
            .unwrap();
        db.touch_recent_directory("u1", Path::new("/srv/one")).unwrap();
        db.touch_recent_directory("u1", Path::new("/srv/two")).unwrap();

        assert_eq!(db.export_bindings(&path).unwrap(), 2);
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let restored = test_db();
        restored.bind_thread("stale", "s9").unwrap();
        assert_eq!(restored.import_bindings(&path).unwrap(), 2);

        assert_eq!(restored.list_bindings().unwrap(), db.list_bindings().unwrap());
        assert!(restored.session_for_thread("stale").unwrap().is_none());
        assert_eq!(
            restored.notification_mode("s1").unwrap(),
            NotificationMode::Important
        );
        assert_eq!(
            restored.directories("u1", DirectoryList::Recent).unwrap(),
            vec![PathBuf::from("/srv/two"), PathBuf::from("/srv/one")]
        );
    }

    #[test]
    fn test_import_rejects_newer_snapshot() {
        let db = test_db();
        db.bind_thread("t1", "s1").unwrap();

        let mut snapshot = db.snapshot().unwrap();
        snapshot.version = SNAPSHOT_VERSION + 1;
        snapshot.bindings.clear();

        assert!(matches!(db.restore_snapshot(&snapshot), Err(Error::Config(_))));
        // Nothing was replaced
        assert_eq!(db.list_bindings().unwrap().len(), 1);
    }

    #[test]
    fn test_import_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bindings.json");
        std::fs::write(&path, "{not json").unwrap();

        let db = test_db();
        assert!(matches!(db.import_bindings(&path), Err(Error::Json(_))));
        assert!(matches!(
            db.import_bindings(&dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }
}
