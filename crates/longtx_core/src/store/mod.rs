//! Table storage seam.
//!
//! The registry does not own table data. It stages writes itself and hands
//! them to a [`TableStore`] on commit, and reads committed blocks back at a
//! snapshot version.

mod memory;

pub use memory::MemoryTableStore;

use crate::error::CoreResult;
use crate::types::SnapshotVersion;
use longtx_protocol::Data;

/// A versioned, append-only table store.
///
/// # Invariants
///
/// - `apply` is atomic: either every block of the batch becomes visible
///   under one new version, or none does
/// - `apply` returns a version strictly greater than any previous one
/// - `read_blocks(path, v)` returns exactly the blocks applied at versions
///   `<= v`, in apply order
/// - Implementations must be `Send + Sync` for concurrent access
pub trait TableStore: Send + Sync {
    /// Returns true if a table exists at `path`.
    fn table_exists(&self, path: &str) -> bool;

    /// Returns the latest committed version.
    fn current_version(&self) -> SnapshotVersion;

    /// Returns the blocks of `path` visible at version `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist.
    fn read_blocks(&self, path: &str, at: SnapshotVersion) -> CoreResult<Vec<Data>>;

    /// Appends every block of `batch` under one new version.
    ///
    /// # Errors
    ///
    /// Returns an error, applying nothing, if any target table is missing.
    fn apply(&self, batch: Vec<(String, Vec<Data>)>) -> CoreResult<SnapshotVersion>;
}
