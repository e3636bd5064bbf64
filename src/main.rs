//! par2guard CLI: scan / verify / repair / report over a PAR2-protected data tree.

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::{error, info, warn};

use par2guard::config::Config;
use par2guard::db::Manifest;
use par2guard::error::Error;
use par2guard::lock::RunLock;
use par2guard::parity::{Par2CliHandler, ParityStore};
use par2guard::reconciler::{reconcile, repair_damaged};
use par2guard::types::FileStatus;
use par2guard::{reporter, scanner};

#[derive(Parser)]
#[command(name = "par2guard", version, about = "PAR2 integrity protection for a directory tree")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Full reconcile pipeline: classify, hash, create/verify parity, sweep deletions
    Scan,
    /// Phases 1-3 only: verify existing files, never create or delete parity
    Verify,
    /// Re-create or repair parity for every damaged/stranded-repaired record
    Repair,
    /// Print the most recent run's summary from the manifest, then exit
    Report,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        println!();
        return ExitCode::from(1);
    };

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(1);
        }
    };
    reporter::init_logging(&config);

    match run(command, &config).await {
        Ok(code) => code,
        Err(Error::LockHeld) => {
            warn!("run lock held by another process, exiting cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "run aborted");
            ExitCode::from(1)
        }
    }
}

async fn run(command: Command, config: &Config) -> par2guard::Result<ExitCode> {
    match command {
        Command::Scan => run_reconcile(config, false).await,
        Command::Verify => run_reconcile(config, true).await,
        Command::Repair => run_repair(config).await,
        Command::Report => run_report(config).await,
    }
}

async fn run_reconcile(config: &Config, verify_only: bool) -> par2guard::Result<ExitCode> {
    let _lock = RunLock::acquire(&config.lock_path())?;
    let manifest = Manifest::open(&config.db_path()).await?;
    let parity = build_parity_handler(config)?;

    let run_id = manifest.start_run().await?;
    let files = scanner::scan_data_roots(config)?;
    let stats = reconcile(config, &manifest, &parity, files, verify_only).await?;
    manifest.finish_run(run_id, &stats).await?;

    reporter::write_run_log(config, run_id, &stats).await?;
    reporter::print_summary(&stats);
    reporter::notify_webhook(config, &stats).await;
    manifest.close().await;

    let failing = if verify_only {
        stats.files_damaged > 0
    } else {
        stats.files_damaged > 0 || stats.files_truncated > 0
    };
    Ok(if failing { ExitCode::from(1) } else { ExitCode::SUCCESS })
}

async fn run_repair(config: &Config) -> par2guard::Result<ExitCode> {
    let _lock = RunLock::acquire(&config.lock_path())?;
    let manifest = Manifest::open(&config.db_path()).await?;
    let parity = build_parity_handler(config)?;

    let run_id = manifest.start_run().await?;
    let stats = repair_damaged(config, &manifest, &parity).await?;
    manifest.finish_run(run_id, &stats).await?;

    reporter::write_run_log(config, run_id, &stats).await?;
    reporter::print_summary(&stats);
    reporter::notify_webhook(config, &stats).await;
    manifest.close().await;

    Ok(if stats.errors.is_empty() { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

const REPORT_RECENT_RUNS: u32 = 5;

async fn run_report(config: &Config) -> par2guard::Result<ExitCode> {
    let manifest = Manifest::open(&config.db_path()).await?;

    let all_files = manifest.get_all_files(None).await?;
    let last_run = manifest.get_last_run().await?;
    let recent_runs = manifest.get_recent_runs(REPORT_RECENT_RUNS).await?;

    println!("\n=== PAR2 Integrity Report ===");
    println!("  Total tracked files: {}", all_files.len());

    let mut by_status: HashMap<&'static str, Vec<&par2guard::FileRecord>> = HashMap::new();
    for f in &all_files {
        by_status.entry(f.status.as_str()).or_default().push(f);
    }
    let mut statuses: Vec<&&'static str> = by_status.keys().collect();
    statuses.sort_unstable();
    for status in &statuses {
        println!("  {}: {}", status, by_status[*status].len());
    }

    if let Some(run) = &last_run {
        println!(
            "\n  Last run: {} \u{2192} {}",
            run.started_at,
            run.finished_at.as_deref().unwrap_or("in progress")
        );
        println!(
            "    Scanned: {}, Created: {}, Verified: {}, Damaged: {}",
            run.files_scanned, run.files_created, run.files_verified, run.files_damaged
        );
    }

    if recent_runs.len() > 1 {
        println!("\n  Recent runs:");
        for run in &recent_runs {
            println!(
                "    #{} {} scanned={} damaged={} repaired={}",
                run.id, run.started_at, run.files_scanned, run.files_damaged, run.files_repaired
            );
        }
    }

    if let Some(damaged) = by_status.get(FileStatus::Damaged.as_str()) {
        println!("\n  Damaged files:");
        for f in damaged {
            println!("    - {}/{}", f.data_root, f.rel_path);
        }
    }

    println!("=============================\n");

    info!("report complete");
    manifest.close().await;
    Ok(ExitCode::SUCCESS)
}

fn build_parity_handler(config: &Config) -> par2guard::Result<Arc<dyn ParityStore>> {
    Par2CliHandler::from_path(config)
        .map(|h| Arc::new(h) as Arc<dyn ParityStore>)
        .ok_or_else(|| Error::ExternalTool("par2 binary not found in PATH".to_string()))
}
