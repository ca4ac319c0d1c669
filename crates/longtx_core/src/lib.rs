//! # Long Transaction Core
//!
//! Transaction registry and chunked data channel for long transactions.
//!
//! This crate provides:
//! - `TransactionManager`: issues transaction ids, validates lifecycle
//!   transitions, and reclaims transactions on commit, rollback or idle
//!   expiry
//! - Write staging with per-(transaction, path) deduplication
//! - Read cursors that return committed data as numbered chunks
//! - The `TableStore` seam to the storage engine, with an in-memory
//!   implementation
//!
//! A long transaction spans many calls:
//!
//! ```rust
//! use longtx_core::{CoreConfig, MemoryTableStore, ReadSelector, TransactionManager, TxType};
//! use longtx_protocol::Data;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryTableStore::new());
//! store.create_table("/Root/events");
//! let manager = TransactionManager::new(CoreConfig::default(), store);
//!
//! let tx = manager.begin(TxType::Write).unwrap();
//! manager
//!     .write(&tx.id, "/Root/events", "batch-1", Some(Data::rows(&b"row"[..])))
//!     .unwrap();
//! manager.commit(&tx.id).unwrap();
//!
//! let reader = manager.begin(TxType::Read).unwrap();
//! let chunk = manager.read(&reader.id, "/Root/events", &ReadSelector::Path).unwrap();
//! assert!(chunk.finished);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod config;
mod error;
mod store;
mod transaction;
mod types;

pub use channel::{validate_path, ReadChunk, ReadCursor, ReadSelector, StagedWrites, WriteOutcome};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use store::{MemoryTableStore, TableStore};
pub use transaction::{CommitOutcome, LongTransaction, LongTxHandle, TransactionManager};
pub use types::{LongTxId, SnapshotVersion, TxState, TxType, LONG_TX_ID_PREFIX};
