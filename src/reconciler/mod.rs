//! Five-phase reconciliation: classify, resolve, verify, sweep, repair.
//!
//! `reconcile` runs its phases strictly sequentially against a single manifest
//! connection. It never spawns concurrent work of its own; the one-file-at-a-time
//! external `par2` invocation is the throughput ceiling by design.
//!
//! ## Submodules
//!
//! - [`classify`] — phase 1: split scanned files into `unchanged` / `needs_hash`
//! - [`resolve`] — phase 2: hash `needs_hash` files and decide touch/modify/move/new
//! - [`verify`] — phase 3: verify (optionally sampled) unchanged files
//! - [`sweep`] — phases 4 and 5: deletions/truncations/exclusions, orphan parity
//! - [`repair`] — the standalone repair operation over damaged/missing records

mod classify;
mod repair;
mod resolve;
mod support;
mod sweep;
mod verify;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::db::Manifest;
use crate::parity::ParityStore;
use crate::types::{FileInfo, RunStats};

pub use repair::repair_damaged;

/// Run the full reconcile pipeline over one scan's worth of files.
///
/// `verify_only` suppresses every mutating phase: no parity is created, no
/// manifest rows are deleted, no orphan parity is cleaned — only verification
/// (phase 3) and its read-only bookkeeping happen.
pub async fn reconcile(
    config: &Config,
    manifest: &Manifest,
    parity: &Arc<dyn ParityStore>,
    scanned_files: Vec<FileInfo>,
    verify_only: bool,
) -> crate::Result<RunStats> {
    let mut stats = RunStats::default();
    let mut seen_on_disk: HashSet<(String, String)> = HashSet::new();

    let classify::Classified { unchanged, needs_hash } =
        classify::classify(manifest, &scanned_files, &mut stats, &mut seen_on_disk).await?;

    info!(
        unchanged = unchanged.len(),
        needs_hash = needs_hash.len(),
        "classified scanned files"
    );

    resolve::resolve_needs_hash(
        config,
        manifest,
        parity,
        needs_hash,
        &seen_on_disk,
        verify_only,
        &mut stats,
    )
    .await?;

    verify::verify_unchanged(config, manifest, parity, unchanged, verify_only, &mut stats).await?;

    if !verify_only {
        sweep::sweep_deletions(config, manifest, parity, &seen_on_disk, &mut stats).await?;
        sweep::cleanup_orphan_parity(config, manifest, parity, &mut stats).await?;
    }

    Ok(stats)
}
