//! The reentrant scoped-transaction combinator.
//!
//! Modeled as a counted scope: entering an already-open transaction defers the
//! commit to the outermost exit, rather than nesting SQL `SAVEPOINT`s. Generalizes
//! the manual `BEGIN`/`COMMIT`/`ROLLBACK` pattern `migrations.rs` already uses for
//! schema upgrades into something reusable by the reconciler's phases 2 and 3.

use std::future::Future;
use std::sync::atomic::Ordering;

use super::Manifest;

impl Manifest {
    /// Run `f` inside a transaction. If a transaction is already open on this
    /// handle (the depth counter is nonzero), `f` simply runs within it and the
    /// existing scope owns the eventual commit/rollback. The outermost call
    /// commits on `Ok` and rolls back on `Err`.
    pub async fn transaction<'a, F, Fut, T>(&'a self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&'a Self) -> Fut,
        Fut: Future<Output = crate::Result<T>> + 'a,
    {
        let depth_before = self.tx_depth.fetch_add(1, Ordering::SeqCst);
        if depth_before == 0 {
            sqlx::query("BEGIN").execute(&self.pool).await?;
        }

        let result = f(self).await;

        let depth_after = self.tx_depth.fetch_sub(1, Ordering::SeqCst);
        if depth_after == 1 {
            match &result {
                Ok(_) => {
                    sqlx::query("COMMIT").execute(&self.pool).await?;
                }
                Err(_) => {
                    let _ = sqlx::query("ROLLBACK").execute(&self.pool).await;
                }
            }
        }

        result
    }
}
