//! Error types for par2guard
//!
//! Three tiers, matching the failure semantics of the reconciliation engine:
//! per-file errors are recoverable within a run and collected as strings on
//! `RunStats`, per-run errors abort the whole run with a diagnostic, and the
//! lock-held condition is a cross-run benign skip handled specially by the driver.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for par2guard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for par2guard
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which environment variable was invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Manifest (SQLite) error
    #[error("manifest error: {0}")]
    Manifest(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to invoke the external par2 binary
    #[error("failed to execute par2: {0}")]
    ExternalTool(String),

    /// The run-level advisory lock is already held by another process
    #[error("run lock held by another process")]
    LockHeld,

    /// Fatal per-run condition (manifest open failure, lock-file open failure, etc.)
    #[error("run aborted: {0}")]
    Run(String),

    /// Webhook notification failed (never fatal, logged by the caller)
    #[error("webhook notification failed: {0}")]
    Webhook(#[from] reqwest::Error),

    /// JSON (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A per-file error surfaced through the typed `FileError` variants below
    #[error("file error: {0}")]
    File(#[from] FileError),
}

/// A per-file error recorded during reconciliation.
///
/// These never abort a run; the reconciler formats them into a display string
/// appended to `RunStats.errors` and moves on to the next file.
#[derive(Debug, Error)]
pub enum FileError {
    /// The file could not be hashed (permissions, I/O failure, vanished mid-scan)
    #[error("hash error: {path}: {reason}")]
    Hash {
        /// Absolute path of the file that failed to hash
        path: PathBuf,
        /// Description of the underlying failure
        reason: String,
    },

    /// Parity creation failed (external par2 exit code nonzero, or timeout)
    #[error("parity create failed: {path}")]
    ParityCreateFailed {
        /// Absolute path of the source file
        path: PathBuf,
    },

    /// Parity creation failed specifically while recovering from a sneaky modification
    #[error("parity create failed (sneaky mod): {path}")]
    ParityCreateFailedSneakyMod {
        /// Absolute path of the source file
        path: PathBuf,
    },

    /// Parity verification returned an error result (not `ok`/`damaged`/`missing_parity`)
    #[error("verify error: {path}")]
    VerifyError {
        /// Absolute path of the source file
        path: PathBuf,
    },

    /// Parity is missing and `verify_only` forbids re-creating it
    #[error("missing parity: {path}")]
    MissingParity {
        /// Absolute path of the source file
        path: PathBuf,
    },

    /// Repair target no longer exists on disk
    #[error("repair target missing: {path}")]
    RepairTargetMissing {
        /// Expected absolute path of the file to repair
        path: PathBuf,
    },

    /// `par2.repair` itself failed
    #[error("repair failed: {path}")]
    RepairFailed {
        /// Absolute path of the file that failed to repair
        path: PathBuf,
    },
}
