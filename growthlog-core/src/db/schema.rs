//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! Timestamps are RFC 3339 strings in UTC; goal target dates are `YYYY-MM-DD`.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: user records and derived records
    r#"
    -- ============================================
    -- User records
    -- ============================================

    CREATE TABLE IF NOT EXISTS journal_entries (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        title            TEXT,
        content          TEXT NOT NULL,
        mood             INTEGER CHECK(mood >= 1 AND mood <= 5),
        energy_level     INTEGER CHECK(energy_level >= 1 AND energy_level <= 5),
        tags             JSON NOT NULL DEFAULT '[]',
        created_at       DATETIME NOT NULL,
        updated_at       DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS goals (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        title            TEXT NOT NULL,
        description      TEXT,
        category         TEXT,
        target_date      DATE,
        status           TEXT NOT NULL DEFAULT 'active',
        progress         INTEGER NOT NULL DEFAULT 0 CHECK(progress >= 0 AND progress <= 100),
        created_at       DATETIME NOT NULL,
        updated_at       DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS habits (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        name              TEXT NOT NULL,
        description       TEXT,
        frequency         TEXT NOT NULL DEFAULT 'daily',
        target_count      INTEGER NOT NULL DEFAULT 1,
        streak_count      INTEGER NOT NULL DEFAULT 0,
        best_streak       INTEGER NOT NULL DEFAULT 0,
        total_completions INTEGER NOT NULL DEFAULT 0,
        created_at        DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS habit_logs (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        habit_id         INTEGER NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
        completed_at     DATETIME NOT NULL,
        note             TEXT
    );

    -- ============================================
    -- Derived records
    -- ============================================

    CREATE TABLE IF NOT EXISTS patterns (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        pattern_type     TEXT NOT NULL,
        title            TEXT NOT NULL,
        description      TEXT,
        confidence       REAL NOT NULL DEFAULT 0 CHECK(confidence >= 0 AND confidence <= 1),
        frequency        TEXT,
        data             JSON,
        first_detected   DATETIME NOT NULL,
        last_seen        DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS insights (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        insight_type       TEXT NOT NULL,
        title              TEXT NOT NULL,
        message            TEXT NOT NULL,
        related_goal_id    INTEGER REFERENCES goals(id) ON DELETE SET NULL,
        related_pattern_id INTEGER REFERENCES patterns(id) ON DELETE SET NULL,
        priority           INTEGER NOT NULL DEFAULT 0,
        is_read            INTEGER NOT NULL DEFAULT 0,
        created_at         DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_journal_created_at ON journal_entries(created_at);
    CREATE INDEX IF NOT EXISTS idx_goals_status ON goals(status);
    CREATE INDEX IF NOT EXISTS idx_habit_logs_habit_id ON habit_logs(habit_id);
    CREATE INDEX IF NOT EXISTS idx_habit_logs_completed_at ON habit_logs(completed_at);
    CREATE INDEX IF NOT EXISTS idx_patterns_identity ON patterns(pattern_type, title);
    CREATE INDEX IF NOT EXISTS idx_insights_read ON insights(is_read);
    "#,
    // Version 2: gamification
    r#"
    CREATE TABLE IF NOT EXISTS achievements (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        name              TEXT NOT NULL UNIQUE,
        description       TEXT NOT NULL,
        icon              TEXT NOT NULL,
        points            INTEGER NOT NULL DEFAULT 0,
        achievement_type  TEXT NOT NULL,
        requirement_data  JSON NOT NULL,
        progress          INTEGER NOT NULL DEFAULT 0,
        target            INTEGER NOT NULL DEFAULT 100,
        unlocked_at       DATETIME
    );

    -- Singleton row
    CREATE TABLE IF NOT EXISTS user_settings (
        id                  INTEGER PRIMARY KEY CHECK (id = 1),
        timezone            TEXT NOT NULL DEFAULT 'UTC',
        daily_reminder_time TEXT,
        points              INTEGER NOT NULL DEFAULT 0,
        level               INTEGER NOT NULL DEFAULT 1,
        updated_at          DATETIME NOT NULL
    );

    INSERT OR IGNORE INTO user_settings (id, updated_at)
    VALUES (1, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'));
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
