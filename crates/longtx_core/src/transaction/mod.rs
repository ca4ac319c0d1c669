//! Long transaction lifecycle.
//!
//! A long transaction is begun, receives any number of writes and reads
//! across separate calls, and ends in exactly one terminal state:
//! committed, rolled back, or expired after staying idle.

mod manager;
mod state;

pub use manager::{CommitOutcome, LongTxHandle, TransactionManager};
pub use state::LongTransaction;
