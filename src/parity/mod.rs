//! Content-addressed PAR2 parity store.
//!
//! [`ParityHandler`] is the codec contract (create/verify/repair); [`ParityStore`]
//! extends it with `delete`, the filesystem bookkeeping the `par2` binary itself
//! has no verb for. Both are backed either by a real external `par2` binary
//! ([`Par2CliHandler`]) or an in-memory fake for tests ([`NoOpParityHandler`]).

mod cli;
mod noop;
mod traits;

pub use cli::Par2CliHandler;
pub use noop::NoOpParityHandler;
pub use traits::{ParityHandler, ParityStore};
