//! # par2guard
//!
//! Forward-error-correction integrity protection for a directory tree of user
//! files, using PAR2 parity sidecars addressed by SHA-256 content hash.
//!
//! Periodically scans a data tree, maintains a persistent manifest of every
//! eligible file, generates parity on change, verifies it on each run, detects
//! moves/renames/deletions/truncations, and repairs damaged files from parity
//! when possible.
//!
//! ## Design Philosophy
//!
//! - **Single-threaded, synchronous reconciliation** — the bottleneck is the
//!   external PAR2 process and disk bandwidth, so there is no intra-run
//!   parallelism; this keeps the manifest's transactional contract simple.
//! - **Content-addressed parity** — files with identical content share one
//!   on-disk artifact, found and verified by SHA-256 hash, not by path.
//! - **Crash-safe by construction** — parity creation stages into a temp
//!   directory and moves atomically; manifest writes batch into transactions
//!   that roll back wholesale on failure.
//!
//! ## Quick Start
//!
//! ```no_run
//! use par2guard::{Config, db::Manifest, parity::Par2CliHandler, reconciler, scanner};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> par2guard::Result<()> {
//!     let config = Config::from_env()?;
//!     let manifest = Manifest::open(&config.db_path()).await?;
//!     let parity: Arc<dyn par2guard::parity::ParityStore> = Arc::new(
//!         Par2CliHandler::from_path(&config).expect("par2 not found in PATH"),
//!     );
//!
//!     let files = scanner::scan_data_roots(&config)?;
//!     let stats = reconciler::reconcile(&config, &manifest, &parity, files, false).await?;
//!     println!("{stats:?}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Environment-variable configuration loading
pub mod config;
/// Transactional manifest of file and run records
pub mod db;
/// Error types
pub mod error;
/// Streaming SHA-256 hashing
pub mod hasher;
/// Run-level advisory locking
pub mod lock;
/// Content-addressed PAR2 parity store
pub mod parity;
/// Five-phase reconciliation pipeline and the standalone repair operation
pub mod reconciler;
/// Logging setup, JSON run logs, and webhook notifications
pub mod reporter;
/// Filesystem scanning
pub mod scanner;
/// Core types: newtype ids, scan/DB record shapes, run statistics
pub mod types;

pub use config::Config;
pub use error::{Error, FileError, Result};
pub use types::{FileId, FileInfo, FileRecord, FileStatus, RunId, RunRecord, RunStats, VerifyOutcome};
