//! # Long Transaction Testkit
//!
//! Test utilities for the long transaction service.
//!
//! This crate provides:
//! - A service fixture with an in-memory table store and typed helpers
//! - Property-based test generators using proptest
//! - Cross-crate integration tests (under `tests/`)
//!
//! ## Usage
//!
//! ```rust
//! use longtx_protocol::TxTypeId;
//! use longtx_testkit::TestService;
//!
//! let service = TestService::with_tables(["/Root/t"]);
//! let tx = service.begin(TxTypeId::Write);
//! service.write(&tx, "/Root/t", "", b"row");
//! service.commit(&tx);
//! assert_eq!(service.read_all_from_new_tx("/Root/t").len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
