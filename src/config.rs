//! Environment-variable configuration loading.
//!
//! Every recognized variable is read with `std::env::var`; unknown/invalid values fail
//! fast with a descriptive `Error::Config` rather than silently falling back to a
//! default (numeric and bounded values only — the default itself is always valid).

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default exclude patterns, applied to filenames and every path component.
///
/// Resolves the "see source" ambiguity in the distilled spec's `EXCLUDE_PATTERNS`
/// default directly from the original implementation.
pub const DEFAULT_EXCLUDE_PATTERNS: &str = ".DS_Store,Thumbs.db,*.tmp,*.partial,.parity,\
#recycle,#archive,#trash,*.zip,*.tar,*.tar.gz,*.tgz,*.tar.bz2,*.tbz2,*.tar.xz,*.txz,*.rar,*.7z";

const DEFAULT_DATA_ROOT: &str = "/data";
const DEFAULT_PARITY_ROOT: &str = "/parity";
const DEFAULT_PAR2_REDUNDANCY: u64 = 10;
const DEFAULT_PAR2_TIMEOUT_SECS: u64 = 3600;
const DEFAULT_MIN_FILE_SIZE: u64 = 4096;
const DEFAULT_MAX_FILE_SIZE: u64 = 53_687_091_200; // 50 GiB
const DEFAULT_VERIFY_PERCENT: u64 = 100;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime configuration, loaded once per process from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root under which data-root labels live.
    pub data_root: PathBuf,
    /// Root for the manifest database, parity store, and run logs.
    pub parity_root: PathBuf,
    /// Percent redundancy requested from the PAR2 encoder, 1..=100.
    pub par2_redundancy: u32,
    /// Per-invocation timeout for external par2 calls; `None` means no timeout.
    pub par2_timeout: Option<std::time::Duration>,
    /// Files smaller than this (bytes) are excluded from scanning.
    pub min_file_size: u64,
    /// Files larger than this (bytes) are excluded; `None` means unlimited.
    pub max_file_size: Option<u64>,
    /// Percent of unchanged files to sample for verification per run, 0..=100.
    pub verify_percent: u32,
    /// Shell-style glob exclude patterns, applied to filenames and path components.
    pub exclude_patterns: Vec<String>,
    /// Log level name passed to the tracing `EnvFilter`.
    pub log_level: String,
    /// Webhook URL to POST run stats to after each run, if set.
    pub notify_webhook: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, applying documented defaults and
    /// failing fast on any value that doesn't parse or falls outside its valid range.
    pub fn from_env() -> Result<Self> {
        let data_root = PathBuf::from(env_or("DATA_ROOT", DEFAULT_DATA_ROOT));
        let parity_root = PathBuf::from(env_or("PARITY_ROOT", DEFAULT_PARITY_ROOT));

        let par2_redundancy = int_env("PAR2_REDUNDANCY", DEFAULT_PAR2_REDUNDANCY, 1, 100)?;
        let par2_timeout_secs = int_env("PAR2_TIMEOUT", DEFAULT_PAR2_TIMEOUT_SECS, 0, u64::MAX)?;
        let min_file_size = int_env("MIN_FILE_SIZE", DEFAULT_MIN_FILE_SIZE, 0, u64::MAX)?;
        let max_file_size = int_env("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE, 0, u64::MAX)?;
        let verify_percent = int_env("VERIFY_PERCENT", DEFAULT_VERIFY_PERCENT, 0, 100)?;

        let raw_excludes = env_or("EXCLUDE_PATTERNS", DEFAULT_EXCLUDE_PATTERNS);
        let exclude_patterns: Vec<String> = raw_excludes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let log_level = env_or("LOG_LEVEL", DEFAULT_LOG_LEVEL);
        let notify_webhook = std::env::var("NOTIFY_WEBHOOK")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            data_root,
            parity_root,
            par2_redundancy: par2_redundancy as u32,
            par2_timeout: if par2_timeout_secs == 0 {
                None
            } else {
                Some(std::time::Duration::from_secs(par2_timeout_secs))
            },
            min_file_size,
            max_file_size: if max_file_size == 0 {
                None
            } else {
                Some(max_file_size)
            },
            verify_percent: verify_percent as u32,
            exclude_patterns,
            log_level,
            notify_webhook,
        })
    }

    /// Path of the manifest database under the parity root.
    pub fn db_path(&self) -> PathBuf {
        self.parity_root.join("_db").join("manifest.db")
    }

    /// Path of the run-level advisory lock file under the parity root.
    pub fn lock_path(&self) -> PathBuf {
        self.parity_root.join("_db").join("run.lock")
    }

    /// Root of the content-addressed parity store.
    pub fn hash_dir(&self) -> PathBuf {
        self.parity_root.join("by_hash")
    }

    /// Root of the JSON run-log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.parity_root.join("_logs")
    }

    /// Parity storage directory for a given content hash.
    pub fn par2_dir_for_hash(&self, content_hash: &str) -> PathBuf {
        self.hash_dir().join(&content_hash[..2])
    }

    /// Parity base filename for a given content hash.
    pub fn par2_name_for_hash(content_hash: &str) -> String {
        format!("{}.par2", &content_hash[..16])
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn int_env(name: &str, default: u64, min: u64, max: u64) -> Result<u64> {
    let raw = match std::env::var(name) {
        Ok(v) => v,
        Err(_) => return Ok(default),
    };
    let val: u64 = raw.parse().map_err(|_| Error::Config {
        message: format!("invalid {name}={raw:?} \u{2014} expected an integer"),
    })?;
    if val < min {
        return Err(Error::Config {
            message: format!("invalid {name}={val} \u{2014} must be >= {min}"),
        });
    }
    if val > max {
        return Err(Error::Config {
            message: format!("invalid {name}={val} \u{2014} must be <= {max}"),
        });
    }
    Ok(val)
}

/// Resolve the absolute path of a tracked file from its manifest coordinates.
pub fn abs_path(data_root: &Path, label: &str, rel_path: &str) -> PathBuf {
    data_root.join(label).join(rel_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "DATA_ROOT",
            "PARITY_ROOT",
            "PAR2_REDUNDANCY",
            "PAR2_TIMEOUT",
            "MIN_FILE_SIZE",
            "MAX_FILE_SIZE",
            "VERIFY_PERCENT",
            "EXCLUDE_PATTERNS",
            "LOG_LEVEL",
            "NOTIFY_WEBHOOK",
        ] {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_match_documented_values() {
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/data"));
        assert_eq!(cfg.parity_root, PathBuf::from("/parity"));
        assert_eq!(cfg.par2_redundancy, 10);
        assert_eq!(cfg.par2_timeout, Some(std::time::Duration::from_secs(3600)));
        assert_eq!(cfg.min_file_size, 4096);
        assert_eq!(cfg.max_file_size, Some(53_687_091_200));
        assert_eq!(cfg.verify_percent, 100);
        assert!(cfg.exclude_patterns.contains(&"*.tmp".to_string()));
        assert_eq!(cfg.notify_webhook, None);
    }

    #[test]
    #[serial]
    fn invalid_int_fails_fast() {
        clear_env();
        unsafe {
            std::env::set_var("PAR2_REDUNDANCY", "not-a-number");
        }
        let result = Config::from_env();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn out_of_range_fails_fast() {
        clear_env();
        unsafe {
            std::env::set_var("PAR2_REDUNDANCY", "0");
        }
        let result = Config::from_env();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn zero_timeout_means_no_timeout() {
        clear_env();
        unsafe {
            std::env::set_var("PAR2_TIMEOUT", "0");
        }
        let cfg = Config::from_env().unwrap();
        clear_env();
        assert_eq!(cfg.par2_timeout, None);
    }

    #[test]
    fn par2_dir_and_name_derive_from_hash() {
        let hash = "a".repeat(64);
        assert_eq!(Config::par2_name_for_hash(&hash), format!("{}.par2", "a".repeat(16)));
    }
}
