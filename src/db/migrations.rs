//! Manifest lifecycle: connection setup and schema creation.

use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::AtomicU32;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use super::Manifest;
use crate::error::Error;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    rel_path     TEXT NOT NULL,
    data_root    TEXT NOT NULL,
    file_size    INTEGER NOT NULL,
    mtime_ns     INTEGER NOT NULL,
    content_hash TEXT NOT NULL,
    par2_name    TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'ok',
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at   TEXT NOT NULL DEFAULT (datetime('now')),
    verified_at  TEXT,
    UNIQUE(data_root, rel_path)
);
CREATE INDEX IF NOT EXISTS idx_content_hash ON files(content_hash);
CREATE INDEX IF NOT EXISTS idx_par2_name ON files(par2_name);
CREATE INDEX IF NOT EXISTS idx_status ON files(status);

CREATE TABLE IF NOT EXISTS runs (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at     TEXT NOT NULL,
    finished_at    TEXT,
    files_scanned  INTEGER DEFAULT 0,
    files_created  INTEGER DEFAULT 0,
    files_verified INTEGER DEFAULT 0,
    files_damaged  INTEGER DEFAULT 0,
    files_repaired INTEGER DEFAULT 0,
    files_moved    INTEGER DEFAULT 0,
    files_deleted  INTEGER DEFAULT 0,
    files_truncated INTEGER DEFAULT 0,
    parity_recreated INTEGER DEFAULT 0,
    orphan_parity_cleaned INTEGER DEFAULT 0,
    errors         TEXT
);
"#;

impl Manifest {
    /// Open (creating if missing) the manifest database at `path`, in WAL mode
    /// with foreign keys enforced, and ensure the schema exists.
    pub async fn open(path: &Path) -> crate::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Run(format!("failed to parse manifest path: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        // A single connection is used per process: a long-running iterator in
        // phase 4 must coexist with writes issued from the same phase, which
        // only works safely against one connection's WAL snapshot.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| Error::Run(format!("failed to open manifest: {e}")))?;

        let manifest = Self {
            pool,
            tx_depth: AtomicU32::new(0),
        };
        manifest.create_schema().await?;
        Ok(manifest)
    }

    async fn create_schema(&self) -> crate::Result<()> {
        for statement in SCHEMA_SQL.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Close the underlying connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
