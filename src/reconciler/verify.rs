//! Phase 3: verify unchanged files, optionally sampling a percentage per run.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::warn;

use crate::config::Config;
use crate::db::Manifest;
use crate::error::FileError;
use crate::hasher::sha256_file;
use crate::parity::ParityStore;
use crate::types::{FileInfo, FileRecord, FileStatus, RunStats, VerifyOutcome};

use super::support::safe_delete_parity;

pub async fn verify_unchanged(
    config: &Config,
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
    unchanged: Vec<(FileInfo, FileRecord)>,
    verify_only: bool,
    stats: &mut RunStats,
) -> crate::Result<()> {
    if unchanged.is_empty() {
        return Ok(());
    }

    let to_verify = sample(unchanged, config.verify_percent);

    manifest
        .transaction(|manifest| async move {
            for (fi, rec) in to_verify {
                let outcome = parity.verify(&fi.abs_path, &rec.content_hash).await?;
                stats.files_verified += 1;

                match outcome {
                    VerifyOutcome::Ok => {
                        manifest.mark_verified(rec.id).await?;
                    }
                    VerifyOutcome::Damaged => {
                        handle_damaged(manifest, &fi, &rec, stats).await?;
                    }
                    VerifyOutcome::MissingParity => {
                        if verify_only {
                            warn!(
                                data_root = %fi.data_root,
                                rel_path = %fi.rel_path,
                                "missing parity (verify-only, cannot re-create)"
                            );
                            stats.errors.push(
                                FileError::MissingParity { path: fi.abs_path.clone() }.to_string(),
                            );
                        } else {
                            handle_missing_parity(manifest, parity, &fi, &rec, stats).await?;
                        }
                    }
                    VerifyOutcome::Error => {
                        stats.errors.push(
                            FileError::VerifyError { path: fi.abs_path.clone() }.to_string(),
                        );
                    }
                }
            }
            Ok(())
        })
        .await
}

/// Matches the Python original's `random.sample` semantics exactly: no
/// stratification across data roots, `max(1, n * percent / 100)` files drawn
/// uniformly from the whole `unchanged` list.
fn sample(
    mut unchanged: Vec<(FileInfo, FileRecord)>,
    verify_percent: u32,
) -> Vec<(FileInfo, FileRecord)> {
    if verify_percent >= 100 {
        return unchanged;
    }
    let sample_size = (unchanged.len() * verify_percent as usize / 100).max(1);
    let mut rng = rand::thread_rng();
    unchanged.shuffle(&mut rng);
    unchanged.truncate(sample_size);
    unchanged
}

/// Handle a `par2 verify` result of "damaged".
///
/// Before trusting it, re-hash the file and compare against the manifest's
/// content hash. A PAR2 filename mismatch (the known false-positive hazard) can
/// report `Damaged` for a file whose bytes never moved; if the hash still
/// matches, this is that false positive and the record is simply re-verified.
/// Only a genuine hash mismatch is recorded as real damage.
async fn handle_damaged(
    manifest: &Manifest,
    fi: &FileInfo,
    rec: &FileRecord,
    stats: &mut RunStats,
) -> crate::Result<()> {
    let content_hash = match sha256_file(&fi.abs_path).await {
        Ok(h) => h,
        Err(e) => {
            stats.errors.push(
                FileError::Hash { path: fi.abs_path.clone(), reason: e.to_string() }.to_string(),
            );
            return Ok(());
        }
    };

    if content_hash == rec.content_hash {
        warn!(
            data_root = %fi.data_root,
            rel_path = %fi.rel_path,
            "verify reported damaged but content hash still matches, treating as a false positive"
        );
        manifest.mark_verified(rec.id).await?;
        return Ok(());
    }

    stats.files_damaged += 1;
    manifest.update_status(rec.id, FileStatus::Damaged).await?;
    warn!(data_root = %fi.data_root, rel_path = %fi.rel_path, "damaged");
    Ok(())
}

/// Re-create parity for a file whose on-disk parity artifact is missing.
///
/// If the current content still matches the manifest's hash, this is a benign
/// gap (parity lost, file untouched). If it doesn't, the file changed without
/// its mtime moving — a "sneaky modification" that phase 1 could not see.
async fn handle_missing_parity(
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
    fi: &FileInfo,
    rec: &FileRecord,
    stats: &mut RunStats,
) -> crate::Result<()> {
    let content_hash = match sha256_file(&fi.abs_path).await {
        Ok(h) => h,
        Err(e) => {
            stats.errors.push(
                FileError::Hash { path: fi.abs_path.clone(), reason: e.to_string() }.to_string(),
            );
            return Ok(());
        }
    };

    if content_hash == rec.content_hash {
        if parity.create(&fi.abs_path, &content_hash).await? {
            stats.parity_recreated += 1;
            manifest.mark_verified(rec.id).await?;
        } else {
            stats.errors.push(
                FileError::ParityCreateFailed { path: fi.abs_path.clone() }.to_string(),
            );
        }
        return Ok(());
    }

    warn!(data_root = %fi.data_root, rel_path = %fi.rel_path, "sneaky modification (hash mismatch)");
    let par2_name = Config::par2_name_for_hash(&content_hash);
    if parity.create(&fi.abs_path, &content_hash).await? {
        safe_delete_parity(manifest, parity, &rec.content_hash).await?;
        manifest
            .upsert_file(
                &fi.data_root,
                &fi.rel_path,
                fi.size,
                fi.mtime_ns,
                &content_hash,
                &par2_name,
                FileStatus::Ok,
            )
            .await?;
        stats.parity_recreated += 1;
    } else {
        stats.errors.push(
            FileError::ParityCreateFailedSneakyMod { path: fi.abs_path.clone() }.to_string(),
        );
    }

    Ok(())
}
