//! In-memory table store.

use crate::error::{CoreError, CoreResult};
use crate::store::TableStore;
use crate::types::SnapshotVersion;
use longtx_protocol::Data;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct VersionedBlock {
    version: SnapshotVersion,
    data: Data,
}

#[derive(Debug, Default)]
struct Inner {
    version: SnapshotVersion,
    tables: BTreeMap<String, Vec<VersionedBlock>>,
}

/// An in-memory table store.
///
/// Suitable for tests, the CLI replay tool, and ephemeral deployments.
/// Tables must be created before they can be written.
///
/// # Example
///
/// ```rust
/// use longtx_core::{MemoryTableStore, TableStore};
/// use longtx_protocol::Data;
///
/// let store = MemoryTableStore::new();
/// store.create_table("/Root/events");
/// let v = store
///     .apply(vec![("/Root/events".into(), vec![Data::rows(&b"r"[..])])])
///     .unwrap();
/// assert_eq!(store.read_blocks("/Root/events", v).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    inner: RwLock<Inner>,
}

impl MemoryTableStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given empty tables.
    #[must_use]
    pub fn with_tables<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for path in paths {
            store.create_table(path);
        }
        store
    }

    /// Creates a table. Returns false if it already existed.
    pub fn create_table(&self, path: impl Into<String>) -> bool {
        let mut inner = self.inner.write();
        let path = path.into();
        if inner.tables.contains_key(&path) {
            return false;
        }
        inner.tables.insert(path, Vec::new());
        true
    }

    /// Drops a table and its data. Returns false if it did not exist.
    pub fn drop_table(&self, path: &str) -> bool {
        self.inner.write().tables.remove(path).is_some()
    }

    /// Returns the number of committed blocks in a table.
    #[must_use]
    pub fn block_count(&self, path: &str) -> usize {
        self.inner.read().tables.get(path).map_or(0, Vec::len)
    }

    /// Returns the paths of all tables.
    #[must_use]
    pub fn table_paths(&self) -> Vec<String> {
        self.inner.read().tables.keys().cloned().collect()
    }
}

impl TableStore for MemoryTableStore {
    fn table_exists(&self, path: &str) -> bool {
        self.inner.read().tables.contains_key(path)
    }

    fn current_version(&self) -> SnapshotVersion {
        self.inner.read().version
    }

    fn read_blocks(&self, path: &str, at: SnapshotVersion) -> CoreResult<Vec<Data>> {
        let inner = self.inner.read();
        let blocks = inner
            .tables
            .get(path)
            .ok_or_else(|| CoreError::table_not_found(path))?;
        Ok(blocks
            .iter()
            .take_while(|block| block.version <= at)
            .map(|block| block.data.clone())
            .collect())
    }

    fn apply(&self, batch: Vec<(String, Vec<Data>)>) -> CoreResult<SnapshotVersion> {
        let mut inner = self.inner.write();

        if let Some((path, _)) = batch
            .iter()
            .find(|(path, _)| !inner.tables.contains_key(path))
        {
            return Err(CoreError::table_not_found(path.as_str()));
        }

        let version = inner.version.next();
        for (path, blocks) in batch {
            if let Some(table) = inner.tables.get_mut(&path) {
                table.extend(blocks.into_iter().map(|data| VersionedBlock { version, data }));
            }
        }
        inner.version = version;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(payload: &'static [u8]) -> Data {
        Data::rows(payload)
    }

    #[test]
    fn create_and_drop() {
        let store = MemoryTableStore::new();
        assert!(store.create_table("/Root/a"));
        assert!(!store.create_table("/Root/a"));
        assert!(store.table_exists("/Root/a"));
        assert!(store.drop_table("/Root/a"));
        assert!(!store.table_exists("/Root/a"));
    }

    #[test]
    fn apply_bumps_version() {
        let store = MemoryTableStore::with_tables(["/Root/a", "/Root/b"]);
        assert_eq!(store.current_version(), SnapshotVersion::new(0));

        let v1 = store
            .apply(vec![
                ("/Root/a".into(), vec![rows(b"1")]),
                ("/Root/b".into(), vec![rows(b"2"), rows(b"3")]),
            ])
            .unwrap();
        assert_eq!(v1, SnapshotVersion::new(1));
        assert_eq!(store.block_count("/Root/b"), 2);
    }

    #[test]
    fn reads_respect_snapshot() {
        let store = MemoryTableStore::with_tables(["/Root/a"]);
        let v1 = store
            .apply(vec![("/Root/a".into(), vec![rows(b"old")])])
            .unwrap();
        store
            .apply(vec![("/Root/a".into(), vec![rows(b"new")])])
            .unwrap();

        let at_v1 = store.read_blocks("/Root/a", v1).unwrap();
        assert_eq!(at_v1, vec![rows(b"old")]);

        let latest = store
            .read_blocks("/Root/a", store.current_version())
            .unwrap();
        assert_eq!(latest.len(), 2);
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let store = MemoryTableStore::with_tables(["/Root/a"]);
        let err = store
            .apply(vec![
                ("/Root/a".into(), vec![rows(b"1")]),
                ("/Root/missing".into(), vec![rows(b"2")]),
            ])
            .unwrap_err();

        assert!(matches!(err, CoreError::TableNotFound { .. }));
        assert_eq!(store.block_count("/Root/a"), 0);
        assert_eq!(store.current_version(), SnapshotVersion::new(0));
    }

    #[test]
    fn read_missing_table() {
        let store = MemoryTableStore::new();
        assert!(store
            .read_blocks("/Root/none", SnapshotVersion::new(0))
            .is_err());
    }
}
