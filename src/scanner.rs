//! Filesystem walk: turns a data root into an ordered stream of [`FileInfo`].

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::types::FileInfo;

/// Compiled exclude patterns, built once per scan and reused for every entry.
struct ExcludeSet(GlobSet);

impl ExcludeSet {
    fn compile(patterns: &[String]) -> crate::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| Error::Config {
                message: format!("invalid exclude pattern {pattern:?}: {e}"),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| Error::Config {
            message: format!("failed to compile exclude patterns: {e}"),
        })?;
        Ok(Self(set))
    }

    fn matches(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

/// Walk every immediate subdirectory of `config.data_root`, treating each as a
/// data-root label, and return every eligible file in deterministic order:
/// labels lexicographically, then each label's tree in lexicographic order.
pub fn scan_data_roots(config: &Config) -> crate::Result<Vec<FileInfo>> {
    let excludes = ExcludeSet::compile(&config.exclude_patterns)?;
    let mut results = Vec::new();

    if !config.data_root.is_dir() {
        warn!(path = %config.data_root.display(), "data root does not exist or is not a directory");
        return Ok(results);
    }

    let mut labels: Vec<_> = std::fs::read_dir(&config.data_root)
        .map_err(Error::Io)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    labels.sort();

    for label in labels {
        let root = config.data_root.join(&label);
        info!(data_root = %label, "scanning data root");
        let mut count = 0usize;

        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                // Only directory names are pruned here; the root itself is always kept.
                entry.depth() == 0
                    || entry.file_type().is_file()
                    || !excludes.matches(&entry.file_name().to_string_lossy())
            })
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "cannot read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if excludes.matches(&file_name) {
                continue;
            }

            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "cannot stat file");
                    continue;
                }
            };

            let size = meta.len();
            if size < config.min_file_size {
                continue;
            }
            if let Some(max) = config.max_file_size {
                if size > max {
                    debug!(path = %entry.path().display(), size, "skipping file above max size");
                    continue;
                }
            }

            let rel_path = relative_slash_path(entry.path(), &root);
            let mtime_ns = mtime_ns(&meta);

            results.push(FileInfo {
                abs_path: entry.path().to_path_buf(),
                data_root: label.clone(),
                rel_path,
                size,
                mtime_ns,
            });
            count += 1;
            if count % 100 == 0 {
                info!(data_root = %label, count, "scan progress");
            }
        }

        info!(data_root = %label, count, "finished scanning data root");
    }

    Ok(results)
}

fn relative_slash_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn mtime_ns(meta: &std::fs::Metadata) -> i128 {
    use std::os::unix::fs::MetadataExt;
    meta.mtime() as i128 * 1_000_000_000 + meta.mtime_nsec() as i128
}

#[cfg(not(unix))]
fn mtime_ns(meta: &std::fs::Metadata) -> i128 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i128)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn test_config(root: &Path) -> Config {
        Config {
            data_root: root.to_path_buf(),
            parity_root: root.join("_parity"),
            par2_redundancy: 10,
            par2_timeout: None,
            min_file_size: 1,
            max_file_size: None,
            verify_percent: 100,
            exclude_patterns: vec!["*.tmp".into(), ".*".into()],
            log_level: "info".into(),
            notify_webhook: None,
        }
    }

    #[test]
    fn finds_eligible_files_under_labels() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("photos/sub")).unwrap();
        fs::write(dir.path().join("photos/a.jpg"), b"hello").unwrap();
        fs::write(dir.path().join("photos/sub/b.jpg"), b"world").unwrap();
        fs::write(dir.path().join("photos/skip.tmp"), b"nope").unwrap();
        fs::write(dir.path().join("orphan_file.jpg"), b"ignored, not under a label").unwrap();

        let config = test_config(dir.path());
        let files = scan_data_roots(&config).unwrap();

        let mut rel_paths: Vec<_> = files.iter().map(|f| f.rel_path.clone()).collect();
        rel_paths.sort();
        assert_eq!(rel_paths, vec!["a.jpg".to_string(), "sub/b.jpg".to_string()]);
    }

    #[test]
    fn prunes_excluded_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs/.git")).unwrap();
        fs::write(dir.path().join("docs/.git/config"), b"ignored").unwrap();
        fs::write(dir.path().join("docs/readme.txt"), b"kept").unwrap();

        let config = test_config(dir.path());
        let files = scan_data_roots(&config).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel_path, "readme.txt");
    }

    #[test]
    fn respects_size_bounds() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/tiny.bin"), b"x").unwrap();
        fs::write(dir.path().join("data/big.bin"), vec![0u8; 4096]).unwrap();

        let mut config = test_config(dir.path());
        config.min_file_size = 2;
        config.max_file_size = Some(1024);
        let files = scan_data_roots(&config).unwrap();

        assert!(files.is_empty());
    }

    #[test]
    fn missing_data_root_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("does-not-exist"));
        let files = scan_data_roots(&config).unwrap();
        assert!(files.is_empty());
    }
}
