//! The standalone repair operation: not a phase of `reconcile`, run on demand.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{self, Config};
use crate::db::Manifest;
use crate::error::FileError;
use crate::hasher::sha256_file;
use crate::parity::ParityStore;
use crate::types::{FileStatus, RunStats, VerifyOutcome};

use super::support::safe_delete_parity;

/// Attempt to repair every record left `damaged`, plus any `repaired` row
/// stranded by a prior crashed repair run (so it gets re-verified and settled).
pub async fn repair_damaged(
    config: &Config,
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
) -> crate::Result<RunStats> {
    let mut stats = RunStats::default();
    let records = manifest
        .get_files_by_statuses(&[FileStatus::Damaged, FileStatus::Repaired])
        .await?;

    for rec in records {
        let abs_path = config::abs_path(&config.data_root, &rec.data_root, &rec.rel_path);
        if !abs_path.exists() {
            stats.errors.push(
                FileError::RepairTargetMissing { path: abs_path.clone() }.to_string(),
            );
            continue;
        }

        let content_hash = match sha256_file(&abs_path).await {
            Ok(h) => h,
            Err(e) => {
                stats.errors.push(
                    FileError::Hash { path: abs_path.clone(), reason: e.to_string() }.to_string(),
                );
                continue;
            }
        };

        if content_hash == rec.content_hash {
            // Data is intact; the parity itself must be what's corrupt.
            info!(data_root = %rec.data_root, rel_path = %rec.rel_path, "data intact, parity corrupt");
            safe_delete_parity(manifest, parity, &rec.content_hash).await?;
            if parity.create(&abs_path, &content_hash).await? {
                manifest.mark_verified(rec.id).await?;
            } else {
                stats.errors.push(
                    FileError::ParityCreateFailed { path: abs_path.clone() }.to_string(),
                );
            }
            continue;
        }

        if parity.repair(&abs_path, &rec.content_hash).await? {
            stats.files_repaired += 1;
            // Transitional: if the process crashes before the re-verify below lands,
            // the next repair run picks this row back up via the {damaged, repaired} scan.
            manifest.update_status(rec.id, FileStatus::Repaired).await?;
            match parity.verify(&abs_path, &rec.content_hash).await? {
                VerifyOutcome::Ok => {
                    manifest.mark_verified(rec.id).await?;
                    info!(data_root = %rec.data_root, rel_path = %rec.rel_path, "repaired");
                }
                _ => {
                    manifest.update_status(rec.id, FileStatus::Damaged).await?;
                    warn!(data_root = %rec.data_root, rel_path = %rec.rel_path, "repair did not hold up to re-verification");
                }
            }
        } else {
            stats.errors.push(FileError::RepairFailed { path: abs_path.clone() }.to_string());
        }
    }

    Ok(stats)
}
