//! `runs` table CRUD.

use chrono::Utc;

use super::Manifest;
use crate::types::{RunId, RunRecord, RunStats};

impl Manifest {
    /// Open a new run row stamped with the current time and return its id.
    pub async fn start_run(&self) -> crate::Result<RunId> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("INSERT INTO runs (started_at) VALUES (?)")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        Ok(RunId::new(result.last_insert_rowid()))
    }

    /// Close out a run with its final counters and joined error log.
    pub async fn finish_run(&self, run_id: RunId, stats: &RunStats) -> crate::Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE runs SET \
                finished_at = ?, \
                files_scanned = ?, \
                files_created = ?, \
                files_verified = ?, \
                files_damaged = ?, \
                files_repaired = ?, \
                files_moved = ?, \
                files_deleted = ?, \
                files_truncated = ?, \
                parity_recreated = ?, \
                orphan_parity_cleaned = ?, \
                errors = ? \
             WHERE id = ?",
        )
        .bind(&now)
        .bind(stats.files_scanned as i64)
        .bind(stats.files_created as i64)
        .bind(stats.files_verified as i64)
        .bind(stats.files_damaged as i64)
        .bind(stats.files_repaired as i64)
        .bind(stats.files_moved as i64)
        .bind(stats.files_deleted as i64)
        .bind(stats.files_truncated as i64)
        .bind(stats.parity_recreated as i64)
        .bind(stats.orphan_parity_cleaned as i64)
        .bind(stats.errors_joined())
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The most recently started run, if any have ever been recorded.
    pub async fn get_last_run(&self) -> crate::Result<Option<RunRecord>> {
        sqlx::query_as::<_, RunRecord>(
            "SELECT id, started_at, finished_at, files_scanned, files_created, files_verified, \
             files_damaged, files_repaired, files_moved, files_deleted, files_truncated, \
             parity_recreated, orphan_parity_cleaned, errors FROM runs \
             ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::Error::from)
    }

    /// The most recent `limit` runs, newest first, for the report subcommand.
    pub async fn get_recent_runs(&self, limit: u32) -> crate::Result<Vec<RunRecord>> {
        sqlx::query_as::<_, RunRecord>(
            "SELECT id, started_at, finished_at, files_scanned, files_created, files_verified, \
             files_damaged, files_repaired, files_moved, files_deleted, files_truncated, \
             parity_recreated, orphan_parity_cleaned, errors FROM runs \
             ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::Error::from)
    }
}
