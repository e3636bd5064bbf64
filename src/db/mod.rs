//! Manifest: a transactional relational store of `FileRecord`s and `RunRecord`s.
//!
//! A single SQLite connection is used per process, in write-ahead-logging mode,
//! so a long-running read iterator (phase 4's deletion sweep) can coexist with
//! writes issued from the same phase.
//!
//! ## Submodules
//!
//! - [`migrations`] — connection setup and schema creation
//! - [`files`] — `files` table CRUD
//! - [`runs`] — `runs` table CRUD
//! - [`transaction`] — the reentrant scoped-transaction combinator

mod files;
mod migrations;
mod runs;
mod transaction;

use std::sync::atomic::AtomicU32;

use sqlx::sqlite::SqlitePool;

/// Manifest handle: the sole owner of `FileRecord`s and `RunRecord`s.
pub struct Manifest {
    pool: SqlitePool,
    tx_depth: AtomicU32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileStatus;

    async fn open_test_manifest() -> (Manifest, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("manifest.db");
        let manifest = Manifest::open(&db_path).await.unwrap();
        (manifest, dir)
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let (manifest, _dir) = open_test_manifest().await;
        manifest
            .upsert_file("photos", "a.jpg", 10240, 111, "h1", "h1name.par2", FileStatus::Ok)
            .await
            .unwrap();

        let rec = manifest.get_file("photos", "a.jpg").await.unwrap().unwrap();
        assert_eq!(rec.content_hash, "h1");
        assert_eq!(rec.file_size, 10240);
        assert_eq!(rec.status, FileStatus::Ok);
    }

    #[tokio::test]
    async fn run_lifecycle_records_counters() {
        let (manifest, _dir) = open_test_manifest().await;
        let run_id = manifest.start_run().await.unwrap();

        let mut stats = crate::types::RunStats::default();
        stats.files_scanned = 5;
        stats.files_created = 2;
        manifest.finish_run(run_id, &stats).await.unwrap();

        let last = manifest.get_last_run().await.unwrap().unwrap();
        assert_eq!(last.files_scanned, 5);
        assert_eq!(last.files_created, 2);
        assert!(last.finished_at.is_some());
    }

    #[tokio::test]
    async fn nested_transactions_defer_to_outermost_scope() {
        let (manifest, _dir) = open_test_manifest().await;

        manifest
            .transaction(|m| async move {
                m.upsert_file("d", "x", 1, 1, "hx", "hxname.par2", FileStatus::Ok)
                    .await?;

                // Reentry: should not commit/rollback independently.
                m.transaction(|m2| async move {
                    m2.upsert_file("d", "y", 1, 1, "hy", "hyname.par2", FileStatus::Ok)
                        .await
                })
                .await?;

                Ok(())
            })
            .await
            .unwrap();

        assert!(manifest.get_file("d", "x").await.unwrap().is_some());
        assert!(manifest.get_file("d", "y").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_transaction_rolls_back() {
        let (manifest, _dir) = open_test_manifest().await;

        let result: crate::Result<()> = manifest
            .transaction(|m| async move {
                m.upsert_file("d", "z", 1, 1, "hz", "hzname.par2", FileStatus::Ok)
                    .await?;
                Err(crate::Error::Run("forced failure".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(manifest.get_file("d", "z").await.unwrap().is_none());
    }
}
