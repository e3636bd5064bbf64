//! Phase 1: classify each scanned file against the manifest by metadata alone.

use std::collections::HashSet;

use crate::db::Manifest;
use crate::types::{FileInfo, FileRecord, RunStats};

/// The two buckets phase 1 produces.
pub struct Classified {
    /// Files whose manifest `mtime_ns`/`file_size` match what was observed on disk.
    pub unchanged: Vec<(FileInfo, FileRecord)>,
    /// Files that are new, or whose mtime/size changed and must be hashed to find out why.
    pub needs_hash: Vec<FileInfo>,
}

pub async fn classify(
    manifest: &Manifest,
    scanned_files: &[FileInfo],
    stats: &mut RunStats,
    seen_on_disk: &mut HashSet<(String, String)>,
) -> crate::Result<Classified> {
    let mut unchanged = Vec::new();
    let mut needs_hash = Vec::new();

    for fi in scanned_files {
        stats.files_scanned += 1;
        seen_on_disk.insert((fi.data_root.clone(), fi.rel_path.clone()));

        match manifest.get_file(&fi.data_root, &fi.rel_path).await? {
            Some(rec) if rec.mtime_ns == fi.mtime_ns as i64 && rec.file_size == fi.size as i64 => {
                unchanged.push((fi.clone(), rec));
            }
            _ => needs_hash.push(fi.clone()),
        }
    }

    Ok(Classified { unchanged, needs_hash })
}
