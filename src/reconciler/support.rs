//! Helpers shared across reconciler phases.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::db::Manifest;
use crate::parity::ParityStore;
use crate::types::{FileInfo, FileRecord, RunStats};

/// Delete parity for `content_hash` only if no manifest row still references it.
/// Content-addressed storage means two paths can share one parity artifact; the
/// last reference standing is responsible for cleanup.
pub(super) async fn safe_delete_parity(
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
    content_hash: &str,
) -> crate::Result<()> {
    let other_refs = manifest.get_files_by_hash(content_hash).await?;
    if other_refs.len() <= 1 {
        parity.delete(content_hash).await;
    }
    Ok(())
}

/// Remove a manifest row and its parity (if now unreferenced), bumping `files_deleted`.
pub(super) async fn delete_file_and_parity(
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
    rec: &FileRecord,
    stats: &mut RunStats,
) -> crate::Result<()> {
    safe_delete_parity(manifest, parity, &rec.content_hash).await?;
    manifest.delete_file(rec.id).await?;
    stats.files_deleted += 1;
    Ok(())
}

/// Look for a manifest entry with the same content hash that has vanished from
/// disk, and treat this new path as its destination.
///
/// Prefers a candidate in the same data root, so same-volume moves are reported
/// as such rather than matching an arbitrary cross-root candidate first.
pub(super) async fn try_match_move(
    manifest: &Manifest,
    fi: &FileInfo,
    content_hash: &str,
    seen_on_disk: &HashSet<(String, String)>,
) -> crate::Result<Option<String>> {
    let candidates = manifest.get_files_by_hash(content_hash).await?;
    let mut disappeared: Vec<FileRecord> = candidates
        .into_iter()
        .filter(|c| !seen_on_disk.contains(&(c.data_root.clone(), c.rel_path.clone())))
        .collect();
    if disappeared.is_empty() {
        return Ok(None);
    }
    disappeared.sort_by_key(|c| c.data_root != fi.data_root);
    let best = disappeared.remove(0);
    let old_path = format!("{}/{}", best.data_root, best.rel_path);

    manifest.update_path(best.id, &fi.rel_path, &fi.data_root).await?;
    manifest.update_mtime(best.id, fi.mtime_ns).await?;

    info!(from = %old_path, to = %format!("{}/{}", fi.data_root, fi.rel_path), "matched move");
    Ok(Some(old_path))
}
