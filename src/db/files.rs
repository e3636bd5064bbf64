//! `files` table CRUD.

use chrono::Utc;

use super::Manifest;
use crate::error::Error;
use crate::types::{FileId, FileRecord, FileStatus};

impl Manifest {
    /// Point lookup by the unique `(data_root, rel_path)` key.
    pub async fn get_file(
        &self,
        data_root: &str,
        rel_path: &str,
    ) -> crate::Result<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, data_root, rel_path, file_size, mtime_ns, content_hash, par2_name, \
             status, created_at, updated_at, verified_at FROM files \
             WHERE data_root = ? AND rel_path = ?",
        )
        .bind(data_root)
        .bind(rel_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from)
    }

    /// Snapshot of every tracked file, optionally filtered to one data root.
    ///
    /// Materializes all rows up front rather than streaming from a live cursor,
    /// per the manifest's "do not observe your own writes" requirement for the
    /// deletion-sweep phase.
    pub async fn get_all_files(&self, data_root: Option<&str>) -> crate::Result<Vec<FileRecord>> {
        let rows = match data_root {
            Some(root) => {
                sqlx::query_as::<_, FileRecord>(
                    "SELECT id, data_root, rel_path, file_size, mtime_ns, content_hash, \
                     par2_name, status, created_at, updated_at, verified_at FROM files \
                     WHERE data_root = ?",
                )
                .bind(root)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, FileRecord>(
                    "SELECT id, data_root, rel_path, file_size, mtime_ns, content_hash, \
                     par2_name, status, created_at, updated_at, verified_at FROM files",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// All records sharing a content hash, used for move-matching and
    /// reference-counted parity deletion.
    pub async fn get_files_by_hash(&self, content_hash: &str) -> crate::Result<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, data_root, rel_path, file_size, mtime_ns, content_hash, par2_name, \
             status, created_at, updated_at, verified_at FROM files WHERE content_hash = ?",
        )
        .bind(content_hash)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from)
    }

    /// Records with the given status, used by the repair operation.
    pub async fn get_files_by_statuses(
        &self,
        statuses: &[FileStatus],
    ) -> crate::Result<Vec<FileRecord>> {
        let mut out = Vec::new();
        for status in statuses {
            let mut rows = sqlx::query_as::<_, FileRecord>(
                "SELECT id, data_root, rel_path, file_size, mtime_ns, content_hash, par2_name, \
                 status, created_at, updated_at, verified_at FROM files WHERE status = ?",
            )
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
            out.append(&mut rows);
        }
        Ok(out)
    }

    /// Whether any record currently references this parity base filename.
    pub async fn has_par2_name(&self, par2_name: &str) -> crate::Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE par2_name = ?")
            .bind(par2_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Insert a new record, or update every mutable column on conflict with the
    /// unique `(data_root, rel_path)` key, bumping `updated_at`.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_file(
        &self,
        data_root: &str,
        rel_path: &str,
        file_size: u64,
        mtime_ns: i128,
        content_hash: &str,
        par2_name: &str,
        status: FileStatus,
    ) -> crate::Result<()> {
        let now = Utc::now().to_rfc3339();
        let file_size = file_size as i64;
        let mtime_ns = mtime_ns as i64;
        sqlx::query(
            "INSERT INTO files (data_root, rel_path, file_size, mtime_ns, content_hash, \
             par2_name, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(data_root, rel_path) DO UPDATE SET \
                 file_size = excluded.file_size, \
                 mtime_ns = excluded.mtime_ns, \
                 content_hash = excluded.content_hash, \
                 par2_name = excluded.par2_name, \
                 status = excluded.status, \
                 updated_at = excluded.updated_at",
        )
        .bind(data_root)
        .bind(rel_path)
        .bind(file_size)
        .bind(mtime_ns)
        .bind(content_hash)
        .bind(par2_name)
        .bind(status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Re-home a record to a new path, used when a move is matched.
    pub async fn update_path(
        &self,
        file_id: FileId,
        new_rel_path: &str,
        new_data_root: &str,
    ) -> crate::Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE files SET rel_path = ?, data_root = ?, updated_at = ? WHERE id = ?")
            .bind(new_rel_path)
            .bind(new_data_root)
            .bind(&now)
            .bind(file_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a touch: mtime changed, content hash did not.
    pub async fn update_mtime(&self, file_id: FileId, mtime_ns: i128) -> crate::Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE files SET mtime_ns = ?, updated_at = ? WHERE id = ?")
            .bind(mtime_ns as i64)
            .bind(&now)
            .bind(file_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Transition a record's lifecycle status.
    pub async fn update_status(&self, file_id: FileId, status: FileStatus) -> crate::Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE files SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&now)
            .bind(file_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Stamp `verified_at` with the current time and move `status` to `ok`.
    pub async fn mark_verified(&self, file_id: FileId) -> crate::Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE files SET verified_at = ?, status = 'ok', updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(&now)
        .bind(file_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove a record permanently. Only called from the reconciler's deletion
    /// phase, never directly by callers outside this crate.
    pub async fn delete_file(&self, file_id: FileId) -> crate::Result<()> {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(file_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
