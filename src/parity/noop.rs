//! In-memory fake parity handler used by tests that don't want a real `par2` binary.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{ParityHandler, ParityStore};
use crate::types::VerifyOutcome;

/// Tracks which content hashes have "parity" without touching the filesystem or
/// spawning a subprocess. `verify` always reports `Ok` for hashes it has created,
/// unless the hash has been poisoned via [`NoOpParityHandler::poison`] to simulate
/// damage, matching the fake's role in exercising the reconciler's decision logic
/// independent of a real PAR2 codec.
#[derive(Default)]
pub struct NoOpParityHandler {
    created: Mutex<HashSet<String>>,
    damaged: Mutex<HashSet<String>>,
}

impl NoOpParityHandler {
    /// Construct an empty fake store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `content_hash` as damaged; the next `verify` call for it reports
    /// `VerifyOutcome::Damaged` instead of `Ok`.
    pub fn poison(&self, content_hash: &str) {
        self.damaged.lock().unwrap().insert(content_hash.to_string());
    }

    /// Whether an artifact is currently tracked for this hash.
    pub fn has_artifact(&self, content_hash: &str) -> bool {
        self.created.lock().unwrap().contains(content_hash)
    }
}

#[async_trait]
impl ParityHandler for NoOpParityHandler {
    async fn create(&self, _source_path: &Path, content_hash: &str) -> crate::Result<bool> {
        self.created.lock().unwrap().insert(content_hash.to_string());
        Ok(true)
    }

    async fn verify(
        &self,
        _source_path: &Path,
        content_hash: &str,
    ) -> crate::Result<VerifyOutcome> {
        if !self.created.lock().unwrap().contains(content_hash) {
            return Ok(VerifyOutcome::MissingParity);
        }
        if self.damaged.lock().unwrap().contains(content_hash) {
            return Ok(VerifyOutcome::Damaged);
        }
        Ok(VerifyOutcome::Ok)
    }

    async fn repair(&self, _source_path: &Path, content_hash: &str) -> crate::Result<bool> {
        if !self.created.lock().unwrap().contains(content_hash) {
            return Ok(false);
        }
        self.damaged.lock().unwrap().remove(content_hash);
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[async_trait]
impl ParityStore for NoOpParityHandler {
    async fn delete(&self, content_hash: &str) {
        self.created.lock().unwrap().remove(content_hash);
        self.damaged.lock().unwrap().remove(content_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_verify_reports_ok() {
        let h = NoOpParityHandler::new();
        h.create(Path::new("/tmp/a"), "h1").await.unwrap();
        assert_eq!(h.verify(Path::new("/tmp/a"), "h1").await.unwrap(), VerifyOutcome::Ok);
    }

    #[tokio::test]
    async fn verify_without_create_reports_missing() {
        let h = NoOpParityHandler::new();
        assert_eq!(
            h.verify(Path::new("/tmp/a"), "h1").await.unwrap(),
            VerifyOutcome::MissingParity
        );
    }

    #[tokio::test]
    async fn poison_then_repair_clears_damage() {
        let h = NoOpParityHandler::new();
        h.create(Path::new("/tmp/a"), "h1").await.unwrap();
        h.poison("h1");
        assert_eq!(h.verify(Path::new("/tmp/a"), "h1").await.unwrap(), VerifyOutcome::Damaged);
        assert!(h.repair(Path::new("/tmp/a"), "h1").await.unwrap());
        assert_eq!(h.verify(Path::new("/tmp/a"), "h1").await.unwrap(), VerifyOutcome::Ok);
    }

    #[tokio::test]
    async fn delete_removes_artifact() {
        let h = NoOpParityHandler::new();
        h.create(Path::new("/tmp/a"), "h1").await.unwrap();
        h.delete("h1").await;
        assert!(!h.has_artifact("h1"));
    }
}
