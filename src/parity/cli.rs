//! External `par2` binary wrapper: create, verify, and repair.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::traits::{ParityHandler, ParityStore};
use crate::config::Config;
use crate::types::VerifyOutcome;

/// Invokes a real `par2` binary as a subprocess for every operation, with a
/// crash-safe staged create and an enforced timeout + process-group kill.
pub struct Par2CliHandler {
    binary_path: PathBuf,
    parity_root: PathBuf,
    redundancy: u32,
    timeout: Option<Duration>,
}

impl Par2CliHandler {
    /// Build a handler for an explicit binary path.
    pub fn new(binary_path: PathBuf, config: &Config) -> Self {
        Self {
            binary_path,
            parity_root: config.parity_root.clone(),
            redundancy: config.par2_redundancy,
            timeout: config.par2_timeout,
        }
    }

    /// Discover `par2` in `PATH` and build a handler from it.
    pub fn from_path(config: &Config) -> Option<Self> {
        which::which("par2").ok().map(|p| Self::new(p, config))
    }

    fn par2_dir_for_hash(&self, content_hash: &str) -> PathBuf {
        self.parity_root.join("by_hash").join(&content_hash[..2])
    }

    async fn run(&self, args: &[&std::ffi::OsStr]) -> crate::Result<std::process::ExitStatus> {
        debug!(args = ?args, "running par2");

        #[cfg(unix)]
        let mut cmd = {
            use tokio::process::Command;
            let mut cmd = Command::new(&self.binary_path);
            // Put the child in its own process group so a timeout kill reaches any
            // grandchildren par2 might spawn, not just the immediate pid.
            unsafe {
                cmd.pre_exec(|| {
                    libc::setpgid(0, 0);
                    Ok(())
                });
            }
            cmd
        };
        #[cfg(not(unix))]
        let mut cmd = tokio::process::Command::new(&self.binary_path);

        cmd.args(args);
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| crate::Error::ExternalTool(format!("failed to spawn par2: {e}")))?;

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(result) => {
                    result.map_err(|e| crate::Error::ExternalTool(format!("par2 wait: {e}")))?
                }
                Err(_) => {
                    warn!(timeout = ?timeout, "par2 invocation timed out, killing process group");
                    kill_process_group(&child);
                    let _ = child.kill().await;
                    return Err(crate::Error::ExternalTool(
                        "par2 invocation timed out".to_string(),
                    ));
                }
            },
            None => child
                .wait()
                .await
                .map_err(|e| crate::Error::ExternalTool(format!("par2 wait: {e}")))?,
        };

        Ok(status)
    }
}

#[cfg(unix)]
fn kill_process_group(child: &tokio::process::Child) {
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &tokio::process::Child) {}

#[async_trait]
impl ParityHandler for Par2CliHandler {
    async fn create(&self, source_path: &Path, content_hash: &str) -> crate::Result<bool> {
        let par2_dir = self.par2_dir_for_hash(content_hash);
        let par2_name = Config::par2_name_for_hash(content_hash);
        let par2_path = par2_dir.join(&par2_name);

        if par2_path.exists() {
            debug!(path = ?par2_path, "parity already exists");
            return Ok(true);
        }

        tokio::fs::create_dir_all(&par2_dir).await?;

        let tmp_dir = tempfile::Builder::new()
            .prefix(".par2guard-tmp-")
            .tempdir_in(&self.parity_root)
            .map_err(|e| crate::Error::ExternalTool(format!("failed to create staging dir: {e}")))?;
        let tmp_par2 = tmp_dir.path().join(&par2_name);

        let parent = source_path.parent().unwrap_or_else(|| Path::new("."));
        let redundancy_arg = format!("-r{}", self.redundancy);

        let args: Vec<&std::ffi::OsStr> = vec![
            std::ffi::OsStr::new("create"),
            std::ffi::OsStr::new("-q"),
            std::ffi::OsStr::new(&redundancy_arg),
            std::ffi::OsStr::new("-B"),
            parent.as_os_str(),
            tmp_par2.as_os_str(),
            source_path.as_os_str(),
        ];

        let status = match self.run(&args).await {
            Ok(s) => s,
            Err(_) => return Ok(false),
        };

        if !status.success() {
            warn!(path = ?source_path, code = ?status.code(), "par2 create failed");
            return Ok(false);
        }

        let mut entries = tokio::fs::read_dir(tmp_dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let dest = par2_dir.join(entry.file_name());
            tokio::fs::rename(entry.path(), dest).await?;
        }

        debug!(path = ?par2_path, "created parity");
        Ok(true)
    }

    async fn verify(
        &self,
        source_path: &Path,
        content_hash: &str,
    ) -> crate::Result<VerifyOutcome> {
        let par2_dir = self.par2_dir_for_hash(content_hash);
        let par2_name = Config::par2_name_for_hash(content_hash);
        let par2_path = par2_dir.join(&par2_name);

        if !par2_path.exists() {
            warn!(path = ?par2_path, "missing parity file");
            return Ok(VerifyOutcome::MissingParity);
        }

        let parent = source_path.parent().unwrap_or_else(|| Path::new("."));
        let args: Vec<&std::ffi::OsStr> = vec![
            std::ffi::OsStr::new("verify"),
            std::ffi::OsStr::new("-q"),
            std::ffi::OsStr::new("-B"),
            parent.as_os_str(),
            par2_path.as_os_str(),
            source_path.as_os_str(),
        ];

        let status = match self.run(&args).await {
            Ok(s) => s,
            Err(_) => return Ok(VerifyOutcome::Error),
        };

        match status.code() {
            Some(0) => Ok(VerifyOutcome::Ok),
            Some(1) => Ok(VerifyOutcome::Damaged),
            other => {
                warn!(path = ?source_path, code = ?other, "par2 verify error");
                Ok(VerifyOutcome::Error)
            }
        }
    }

    async fn repair(&self, source_path: &Path, content_hash: &str) -> crate::Result<bool> {
        let par2_dir = self.par2_dir_for_hash(content_hash);
        let par2_name = Config::par2_name_for_hash(content_hash);
        let par2_path = par2_dir.join(&par2_name);

        if !par2_path.exists() {
            warn!(path = ?par2_path, "cannot repair, missing parity");
            return Ok(false);
        }

        let parent = source_path.parent().unwrap_or_else(|| Path::new("."));
        let args: Vec<&std::ffi::OsStr> = vec![
            std::ffi::OsStr::new("repair"),
            std::ffi::OsStr::new("-q"),
            std::ffi::OsStr::new("-B"),
            parent.as_os_str(),
            par2_path.as_os_str(),
            source_path.as_os_str(),
        ];

        let status = match self.run(&args).await {
            Ok(s) => s,
            Err(_) => return Ok(false),
        };

        Ok(status.success())
    }

    fn name(&self) -> &'static str {
        "par2-cli"
    }
}

#[async_trait]
impl ParityStore for Par2CliHandler {
    async fn delete(&self, content_hash: &str) {
        let par2_dir = self.par2_dir_for_hash(content_hash);
        let par2_name = Config::par2_name_for_hash(content_hash);
        let stem = par2_name.trim_end_matches(".par2").to_string();

        let Ok(mut entries) = tokio::fs::read_dir(&par2_dir).await else {
            return;
        };

        let mut removed = 0u32;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == par2_name || name.starts_with(&format!("{stem}.")) {
                if tokio::fs::remove_file(entry.path()).await.is_ok() {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!(hash = &content_hash[..16], count = removed, "removed parity files");
            let _ = tokio::fs::remove_dir(&par2_dir).await;
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            data_root: PathBuf::from("/data"),
            parity_root: PathBuf::from("/tmp"),
            par2_redundancy: 10,
            par2_timeout: Some(Duration::from_secs(5)),
            min_file_size: 0,
            max_file_size: None,
            verify_percent: 100,
            exclude_patterns: vec![],
            log_level: "info".into(),
            notify_webhook: None,
        }
    }

    #[test]
    fn from_path_consistent_with_which() {
        let which_result = which::which("par2");
        let handler = Par2CliHandler::from_path(&test_config());
        assert_eq!(which_result.is_ok(), handler.is_some());
    }

    #[tokio::test]
    async fn create_with_invalid_binary_reports_failure_not_panic() {
        let mut cfg = test_config();
        cfg.par2_timeout = Some(Duration::from_secs(5));
        let handler = Par2CliHandler::new(PathBuf::from("/nonexistent/par2"), &cfg);
        let result = handler.create(Path::new("/tmp/does-not-exist"), &"a".repeat(64)).await;
        assert_eq!(result.unwrap(), false);
    }
}
