//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: sessions, bindings, per-session preferences
    r#"
    CREATE TABLE IF NOT EXISTS tracked_sessions (
        session_id       TEXT PRIMARY KEY,
        file_path        TEXT NOT NULL,
        last_byte_offset INTEGER NOT NULL DEFAULT 0 CHECK (last_byte_offset >= 0),
        updated_at       DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS thread_bindings (
        thread_id        TEXT PRIMARY KEY,
        session_id       TEXT NOT NULL,
        bound_at         DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_thread_bindings_session
        ON thread_bindings(session_id);

    CREATE TABLE IF NOT EXISTS session_preferences (
        session_id        TEXT PRIMARY KEY,
        notification_mode TEXT NOT NULL DEFAULT 'all'
                          CHECK (notification_mode IN ('all', 'important', 'muted')),
        updated_at        DATETIME NOT NULL
    );
    "#,
    // Version 2: per-user working directories
    r#"
    CREATE TABLE IF NOT EXISTS user_directories (
        user_id          TEXT NOT NULL,
        list             TEXT NOT NULL CHECK (list IN ('recent', 'favorite')),
        path             TEXT NOT NULL,
        -- Monotonic per (user_id, list); higher is more recent
        last_used        INTEGER NOT NULL,
        added_at         DATETIME NOT NULL,
        PRIMARY KEY (user_id, list, path)
    );

    CREATE INDEX IF NOT EXISTS idx_user_directories_order
        ON user_directories(user_id, list, last_used DESC);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        assert_eq!(MIGRATIONS.len() as i32, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = [
            "tracked_sessions",
            "thread_bindings",
            "session_preferences",
            "user_directories",
        ];

        for table in tables {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_upgrade_from_v1() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0]).unwrap();
        conn.execute_batch("PRAGMA user_version = 1").unwrap();
        conn.execute(
            "INSERT INTO thread_bindings (thread_id, session_id, bound_at) VALUES ('t', 's', '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM thread_bindings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_offset_must_be_non_negative() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO tracked_sessions (session_id, file_path, last_byte_offset, updated_at) VALUES ('s', '/x', -1, '2025-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
