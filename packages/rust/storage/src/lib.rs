//! libSQL storage layer (local embedded mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding the previous
//! landing-page snapshot per URL and the history of pipeline runs.
//!
//! **Access rules:**
//! - `tracktect run`: read-write via [`Storage::open`]
//! - `tracktect history`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracktect_shared::{Result, TracktectError};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// Messaging lines captured from a landing page.
#[derive(Debug, Clone, PartialEq)]
pub struct LandingSnapshot {
    pub url: String,
    pub lines: Vec<String>,
    /// SHA-256 of the joined lines.
    pub content_hash: String,
    pub captured_at: DateTime<Utc>,
}

/// One row of the run history.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub url_count: usize,
    pub status: String,
}

fn storage_err(e: impl std::fmt::Display) -> TracktectError {
    TracktectError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TracktectError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    TracktectError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(TracktectError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Landing snapshots
    // -----------------------------------------------------------------------

    /// Get the last stored snapshot for a URL.
    pub async fn get_snapshot(&self, url: &str) -> Result<Option<LandingSnapshot>> {
        let mut rows = self
            .conn
            .query(
                "SELECT url, lines_json, content_hash, captured_at
                 FROM landing_snapshots WHERE url = ?1",
                params![url],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_snapshot(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Insert or replace the snapshot for `snapshot.url`.
    pub async fn upsert_snapshot(&self, snapshot: &LandingSnapshot) -> Result<()> {
        self.check_writable()?;
        let lines_json = serde_json::to_string(&snapshot.lines).map_err(storage_err)?;
        self.conn
            .execute(
                "INSERT INTO landing_snapshots (url, lines_json, content_hash, captured_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(url) DO UPDATE SET
                   lines_json = excluded.lines_json,
                   content_hash = excluded.content_hash,
                   captured_at = excluded.captured_at",
                params![
                    snapshot.url.as_str(),
                    lines_json,
                    snapshot.content_hash.as_str(),
                    snapshot.captured_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Run history
    // -----------------------------------------------------------------------

    /// Record the start of a pipeline run.
    pub async fn insert_run(&self, run_id: &str, url_count: usize) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO runs (id, started_at, url_count, status) VALUES (?1, ?2, ?3, 'running')",
                params![run_id, now.as_str(), url_count as i64],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Mark a run as finished with a final status.
    pub async fn finish_run(&self, run_id: &str, status: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs SET finished_at = ?1, status = ?2 WHERE id = ?3",
                params![now.as_str(), status, run_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// List the most recent runs, newest first.
    pub async fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, started_at, finished_at, url_count, status
                 FROM runs ORDER BY started_at DESC, id DESC LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(RunRecord {
                id: row.get::<String>(0).map_err(storage_err)?,
                started_at: row.get::<String>(1).map_err(storage_err)?,
                finished_at: row.get::<String>(2).ok(),
                url_count: row.get::<i64>(3).map_err(storage_err)? as usize,
                status: row.get::<String>(4).map_err(storage_err)?,
            });
        }
        Ok(results)
    }
}

/// Convert a database row to a [`LandingSnapshot`].
fn row_to_snapshot(row: &libsql::Row) -> Result<LandingSnapshot> {
    let lines_json: String = row.get(1).map_err(storage_err)?;
    Ok(LandingSnapshot {
        url: row.get::<String>(0).map_err(storage_err)?,
        lines: serde_json::from_str(&lines_json)
            .map_err(|e| TracktectError::Storage(format!("invalid snapshot lines: {e}")))?,
        content_hash: row.get::<String>(2).map_err(storage_err)?,
        captured_at: {
            let s: String = row.get(3).map_err(storage_err)?;
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| TracktectError::Storage(format!("invalid date: {e}")))?
        },
    })
}
