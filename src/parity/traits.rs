//! Traits and types for PAR2 parity handling.

use async_trait::async_trait;
use std::path::Path;

use crate::types::VerifyOutcome;

/// Trait for the PAR2 codec contract itself: the operations that go through the
/// external `par2` binary (or its test fake).
///
/// Every operation is keyed by a SHA-256 content hash `H` (lowercase hex, 64 chars).
/// Implementations own invoking the external codec; the reconciler owns deciding
/// *when* to call these and what to do with the manifest afterward.
#[async_trait]
pub trait ParityHandler: Send + Sync {
    /// Create parity for `source_path`, storing it under the content-addressed
    /// location for `content_hash`. Returns `Ok(true)` if an artifact already
    /// existed or was created successfully; `Ok(false)` on any encoder failure or
    /// timeout, in which case no partial artifact is left behind.
    async fn create(&self, source_path: &Path, content_hash: &str) -> crate::Result<bool>;

    /// Verify `source_path` against the parity artifact for `content_hash`.
    async fn verify(&self, source_path: &Path, content_hash: &str)
    -> crate::Result<VerifyOutcome>;

    /// Attempt to repair `source_path` in place using the parity artifact for
    /// `content_hash`. Requires the artifact to exist; returns `Ok(false)` if it
    /// does not, or if the external repairer itself fails.
    async fn repair(&self, source_path: &Path, content_hash: &str) -> crate::Result<bool>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}

/// The content-addressed store sitting on top of a [`ParityHandler`].
///
/// Deletion is pure filesystem bookkeeping — the `par2` binary has no delete
/// verb, so it belongs to the store that owns the on-disk layout, not to the
/// codec trait above.
#[async_trait]
pub trait ParityStore: ParityHandler {
    /// Remove the parity artifact (base file and volume siblings) for `content_hash`.
    /// Best-effort: filesystem errors are swallowed, matching the original's
    /// "not empty, that's fine" tolerance when cleaning up the prefix directory.
    async fn delete(&self, content_hash: &str);
}
