//! SQL migration definitions for the TrackTect database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: landing_snapshots, runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Last seen messaging lines per landing page
CREATE TABLE IF NOT EXISTS landing_snapshots (
    url          TEXT PRIMARY KEY,
    lines_json   TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    captured_at  TEXT NOT NULL
);

-- Pipeline run history
CREATE TABLE IF NOT EXISTS runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    url_count   INTEGER NOT NULL,
    status      TEXT NOT NULL DEFAULT 'running'
);

CREATE INDEX IF NOT EXISTS idx_runs_started ON runs(started_at);

INSERT OR IGNORE INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
