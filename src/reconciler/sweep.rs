//! Phases 4 and 5: deletions/truncations/exclusions, then orphan parity cleanup.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::config::{self, Config};
use crate::db::Manifest;
use crate::parity::ParityStore;
use crate::types::{FileRecord, FileStatus, RunStats};

use super::support::delete_file_and_parity;

/// Walk every manifest row not seen in this scan and decide why: excluded,
/// over the size cap, truncated below the floor, or genuinely deleted.
///
/// Reads the full manifest snapshot up front (see [`Manifest::get_all_files`]):
/// the writes this phase issues must not be observed by its own enumeration.
pub async fn sweep_deletions(
    config: &Config,
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
    seen_on_disk: &HashSet<(String, String)>,
    stats: &mut RunStats,
) -> crate::Result<()> {
    let all_records = manifest.get_all_files(None).await?;

    for rec in all_records {
        let key = (rec.data_root.clone(), rec.rel_path.clone());
        if seen_on_disk.contains(&key) {
            continue;
        }

        let abs_path = config::abs_path(&config.data_root, &rec.data_root, &rec.rel_path);
        if !abs_path.exists() {
            info!(data_root = %rec.data_root, rel_path = %rec.rel_path, "deleted");
            delete_file_and_parity(manifest, parity, &rec, stats).await?;
            continue;
        }

        if is_excluded(&rec, &config.exclude_patterns) {
            info!(data_root = %rec.data_root, rel_path = %rec.rel_path, "excluded");
            delete_file_and_parity(manifest, parity, &rec, stats).await?;
        } else if exceeds_max_file_size(config, &abs_path) {
            info!(data_root = %rec.data_root, rel_path = %rec.rel_path, "exceeds max file size");
            delete_file_and_parity(manifest, parity, &rec, stats).await?;
        } else {
            tracing::warn!(data_root = %rec.data_root, rel_path = %rec.rel_path, "truncated");
            manifest.update_status(rec.id, FileStatus::Truncated).await?;
            stats.files_truncated += 1;
        }
    }

    Ok(())
}

fn is_excluded(rec: &FileRecord, patterns: &[String]) -> bool {
    let data_root_excluded = patterns
        .iter()
        .any(|p| glob_match(p, &rec.data_root));
    let component_excluded = rec
        .rel_path
        .split('/')
        .any(|part| patterns.iter().any(|p| glob_match(p, part)));
    data_root_excluded || component_excluded
}

fn glob_match(pattern: &str, name: &str) -> bool {
    globset::Glob::new(pattern)
        .map(|g| g.compile_matcher().is_match(name))
        .unwrap_or(false)
}

fn exceeds_max_file_size(config: &Config, abs_path: &std::path::Path) -> bool {
    let Some(max) = config.max_file_size else {
        return false;
    };
    match std::fs::metadata(abs_path) {
        Ok(meta) => meta.len() > max,
        Err(_) => false,
    }
}

/// Remove on-disk `*.par2` base artifacts (excluding `.volNNN` siblings) that no
/// manifest row references by `par2_name`, via a reconstructed pseudo-hash.
pub async fn cleanup_orphan_parity(
    config: &Config,
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
    stats: &mut RunStats,
) -> crate::Result<()> {
    let hash_dir = config.hash_dir();
    if !hash_dir.is_dir() {
        return Ok(());
    }

    let mut prefix_dirs: Vec<_> = std::fs::read_dir(&hash_dir)
        .map_err(crate::Error::Io)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    prefix_dirs.sort_by_key(|e| e.file_name());

    for prefix_dir in prefix_dirs {
        let mut entries: Vec<_> = std::fs::read_dir(prefix_dir.path())
            .map_err(crate::Error::Io)?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".par2") || name.contains(".vol") {
                continue;
            }
            if manifest.has_par2_name(&name).await? {
                continue;
            }

            let stem = name.trim_end_matches(".par2");
            let pseudo_hash = format!("{stem:0<64}");
            parity.delete(&pseudo_hash).await;
            info!(prefix = %prefix_dir.file_name().to_string_lossy(), par2_name = %name, "cleaned orphan parity");
            stats.orphan_parity_cleaned += 1;
        }
    }

    Ok(())
}
