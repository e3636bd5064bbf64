//! Phase 2: hash every file that needs it and decide touch / modify / move / new.
//!
//! Runs inside a single manifest transaction so a crash mid-phase leaves either
//! every decided action committed or none of them.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::db::Manifest;
use crate::error::FileError;
use crate::hasher::sha256_file;
use crate::parity::ParityStore;
use crate::types::{FileInfo, RunStats};

use super::support::{safe_delete_parity, try_match_move};

pub async fn resolve_needs_hash(
    config: &Config,
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
    needs_hash: Vec<FileInfo>,
    seen_on_disk: &HashSet<(String, String)>,
    verify_only: bool,
    stats: &mut RunStats,
) -> crate::Result<()> {
    manifest
        .transaction(|manifest| async move {
            for fi in needs_hash {
                resolve_one(config, manifest, parity, &fi, seen_on_disk, verify_only, stats)
                    .await?;
            }
            Ok(())
        })
        .await
}

async fn resolve_one(
    config: &Config,
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
    fi: &FileInfo,
    seen_on_disk: &HashSet<(String, String)>,
    verify_only: bool,
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

    let existing = manifest.get_file(&fi.data_root, &fi.rel_path).await?;

    match existing {
        Some(rec) if rec.content_hash == content_hash => {
            debug!(data_root = %fi.data_root, rel_path = %fi.rel_path, "touched (mtime only)");
            manifest.update_mtime(rec.id, fi.mtime_ns).await?;
        }
        Some(rec) => {
            info!(data_root = %fi.data_root, rel_path = %fi.rel_path, "modified");
            if !verify_only {
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
                            crate::types::FileStatus::Ok,
                        )
                        .await?;
                    stats.files_created += 1;
                } else {
                    stats.errors.push(
                        FileError::ParityCreateFailed { path: fi.abs_path.clone() }.to_string(),
                    );
                }
            }
        }
        None => {
            let moved = try_match_move(manifest, fi, &content_hash, seen_on_disk).await?;
            if let Some(old_path) = moved {
                stats.files_moved += 1;
                info!(from = %old_path, to = %format!("{}/{}", fi.data_root, fi.rel_path), "moved");
            } else if !verify_only {
                let par2_name = Config::par2_name_for_hash(&content_hash);
                if parity.create(&fi.abs_path, &content_hash).await? {
                    manifest
                        .upsert_file(
                            &fi.data_root,
                            &fi.rel_path,
                            fi.size,
                            fi.mtime_ns,
                            &content_hash,
                            &par2_name,
                            crate::types::FileStatus::Ok,
                        )
                        .await?;
                    stats.files_created += 1;
                    info!(data_root = %fi.data_root, rel_path = %fi.rel_path, "new");
                } else {
                    stats.errors.push(
                        FileError::ParityCreateFailed { path: fi.abs_path.clone() }.to_string(),
                    );
                }
            }
        }
    }

    Ok(())
}
