//! Logging setup, JSON run logs, human-readable summaries, and webhook notifications.

use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::types::{RunId, RunStats};

/// Install the global tracing subscriber, honoring `RUST_LOG` if set and
/// otherwise falling back to `config.log_level`.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Write a JSON log file for this run under `config.log_dir()`.
pub async fn write_run_log(config: &Config, run_id: RunId, stats: &RunStats) -> crate::Result<()> {
    let log_dir = config.log_dir();
    tokio::fs::create_dir_all(&log_dir).await?;

    let now = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let log_path = log_dir.join(format!("run_{run_id}_{now}.json"));

    let mut payload = serde_json::to_value(stats)?;
    if let serde_json::Value::Object(ref mut map) = payload {
        map.insert("run_id".into(), serde_json::json!(run_id.get()));
        map.insert("timestamp".into(), serde_json::json!(now));
        map.insert("errors".into(), serde_json::json!(stats.errors_joined()));
    }

    let text = serde_json::to_string_pretty(&payload)?;
    tokio::fs::write(&log_path, text).await?;

    info!(path = %log_path.display(), "run log written");
    Ok(())
}

/// Print a human-readable summary of `stats` to stdout.
pub fn print_summary(stats: &RunStats) {
    println!("\n=== PAR2 Integrity Run Summary ===");
    println!("  Files scanned:  {}", stats.files_scanned);
    println!("  Parity created: {}", stats.files_created);
    println!("  Verified:       {}", stats.files_verified);
    println!("  Damaged:        {}", stats.files_damaged);
    println!("  Repaired:       {}", stats.files_repaired);
    println!("  Moved:          {}", stats.files_moved);
    println!("  Deleted:        {}", stats.files_deleted);
    println!("  Truncated:      {}", stats.files_truncated);
    if let Some(errors) = stats.errors_joined() {
        println!("  Errors:\n    {errors}");
    }
    println!("==================================\n");
}

/// Fire-and-forget POST of `stats` to `config.notify_webhook`, if configured.
/// A webhook failure is logged and never propagated — notification is best-effort.
pub async fn notify_webhook(config: &Config, stats: &RunStats) {
    let Some(url) = &config.notify_webhook else {
        return;
    };

    let client = reqwest::Client::new();
    let request = client.post(url).json(stats).timeout(std::time::Duration::from_secs(30));

    match request.send().await {
        Ok(response) if response.status().is_success() => {
            info!(status = %response.status(), "webhook notified");
        }
        Ok(response) => {
            warn!(status = %response.status(), "webhook returned non-success status");
        }
        Err(e) => {
            error!(error = %e, "webhook failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunId;

    fn test_config(root: &std::path::Path) -> Config {
        Config {
            data_root: root.join("data"),
            parity_root: root.to_path_buf(),
            par2_redundancy: 10,
            par2_timeout: None,
            min_file_size: 0,
            max_file_size: None,
            verify_percent: 100,
            exclude_patterns: vec![],
            log_level: "info".into(),
            notify_webhook: None,
        }
    }

    #[tokio::test]
    async fn run_log_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut stats = RunStats::default();
        stats.files_scanned = 3;
        stats.errors.push("boom".into());

        write_run_log(&config, RunId::new(7), &stats).await.unwrap();

        let mut entries = tokio::fs::read_dir(config.log_dir()).await.unwrap();
        let entry = entries.next_entry().await.unwrap().unwrap();
        let content = tokio::fs::read_to_string(entry.path()).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(parsed["run_id"], serde_json::json!(7));
        assert_eq!(parsed["files_scanned"], serde_json::json!(3));
        assert_eq!(parsed["errors"], serde_json::json!("boom"));
    }

    #[tokio::test]
    async fn webhook_without_url_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        notify_webhook(&config, &RunStats::default()).await;
    }
}
