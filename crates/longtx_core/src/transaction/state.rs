//! Per-transaction state.

use crate::channel::{ReadChunk, ReadCursor, StagedWrites, WriteOutcome};
use crate::error::{CoreError, CoreResult};
use crate::types::{LongTxId, SnapshotVersion, TxState, TxType};
use longtx_protocol::Data;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// An in-flight long transaction.
///
/// Holds staged writes per path (write transactions) and open read cursors.
/// Every mutating call checks the transaction is still active, so once a
/// terminal state is set the transaction rejects all further work.
#[derive(Debug)]
pub struct LongTransaction {
    id: LongTxId,
    tx_type: TxType,
    snapshot: SnapshotVersion,
    state: TxState,
    last_activity: Instant,
    staged: BTreeMap<String, StagedWrites>,
    cursors: HashMap<String, ReadCursor>,
}

impl LongTransaction {
    pub(crate) fn new(id: LongTxId, tx_type: TxType, snapshot: SnapshotVersion) -> Self {
        Self {
            id,
            tx_type,
            snapshot,
            state: TxState::Active,
            last_activity: Instant::now(),
            staged: BTreeMap::new(),
            cursors: HashMap::new(),
        }
    }

    /// Returns the transaction id.
    #[must_use]
    pub fn id(&self) -> LongTxId {
        self.id
    }

    /// Returns the transaction type.
    #[must_use]
    pub fn tx_type(&self) -> TxType {
        self.tx_type
    }

    /// Returns the snapshot version reads observe.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotVersion {
        self.snapshot
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Returns true while the transaction accepts work.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TxState::Active
    }

    /// Returns how long the transaction has been idle at `now`.
    #[must_use]
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Returns the paths with staged writes.
    pub fn staged_paths(&self) -> impl Iterator<Item = &str> {
        self.staged.keys().map(String::as_str)
    }

    /// Returns the number of staged blocks across all paths.
    #[must_use]
    pub fn staged_block_count(&self) -> usize {
        self.staged.values().map(StagedWrites::len).sum()
    }

    /// Returns the number of open read cursors.
    #[must_use]
    pub fn open_cursor_count(&self) -> usize {
        self.cursors.len()
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub(crate) fn ensure_active(&self) -> CoreResult<()> {
        if self.state.is_terminal() {
            return Err(CoreError::TxTerminated {
                id: self.id,
                state: self.state,
            });
        }
        Ok(())
    }

    pub(crate) fn ensure_writable(&self) -> CoreResult<()> {
        if self.tx_type != TxType::Write {
            return Err(CoreError::ReadOnlyTransaction { id: self.id });
        }
        Ok(())
    }

    /// Stages a block for `path`.
    pub(crate) fn stage_write(
        &mut self,
        path: &str,
        dedup_id: &str,
        data: Data,
    ) -> CoreResult<WriteOutcome> {
        self.ensure_active()?;
        self.ensure_writable()?;
        let outcome = self
            .staged
            .entry(path.to_string())
            .or_default()
            .stage(path, dedup_id, data)?;
        self.touch();
        Ok(outcome)
    }

    /// Returns the next chunk of `path`, opening a cursor with `load` if none
    /// is open. A cursor is closed after its finished chunk, so the next read
    /// of the same path starts over from chunk 0.
    pub(crate) fn next_chunk<F>(&mut self, path: &str, load: F) -> CoreResult<ReadChunk>
    where
        F: FnOnce(SnapshotVersion) -> CoreResult<Vec<Data>>,
    {
        self.ensure_active()?;
        if !self.cursors.contains_key(path) {
            let blocks = load(self.snapshot)?;
            self.cursors
                .insert(path.to_string(), ReadCursor::new(blocks));
        }

        let chunk = self
            .cursors
            .get_mut(path)
            .and_then(ReadCursor::next_chunk)
            .ok_or_else(|| CoreError::store(format!("read cursor for {path} is exhausted")))?;
        if chunk.finished {
            self.cursors.remove(path);
        }
        self.touch();
        Ok(chunk)
    }

    /// Takes the staged writes, ordered by path, leaving none behind.
    pub(crate) fn take_staged(&mut self) -> Vec<(String, Vec<Data>)> {
        std::mem::take(&mut self.staged)
            .into_iter()
            .filter(|(_, writes)| !writes.is_empty())
            .map(|(path, writes)| (path, writes.into_blocks()))
            .collect()
    }

    /// Moves the transaction into a terminal state, dropping its buffers.
    pub(crate) fn finish(&mut self, state: TxState) {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.staged.clear();
        self.cursors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_txn() -> LongTransaction {
        LongTransaction::new(LongTxId::generate(), TxType::Write, SnapshotVersion::new(0))
    }

    #[test]
    fn new_transaction_is_active() {
        let txn = write_txn();
        assert!(txn.is_active());
        assert_eq!(txn.staged_block_count(), 0);
    }

    #[test]
    fn read_transaction_rejects_writes() {
        let mut txn =
            LongTransaction::new(LongTxId::generate(), TxType::Read, SnapshotVersion::new(0));
        let err = txn
            .stage_write("/t", "a", Data::rows(&b"x"[..]))
            .unwrap_err();
        assert!(matches!(err, CoreError::ReadOnlyTransaction { .. }));
    }

    #[test]
    fn take_staged_orders_by_path() {
        let mut txn = write_txn();
        txn.stage_write("/b", "1", Data::rows(&b"b"[..])).unwrap();
        txn.stage_write("/a", "1", Data::rows(&b"a"[..])).unwrap();

        let batch = txn.take_staged();
        let paths: Vec<_> = batch.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
        assert_eq!(txn.staged_block_count(), 0);
    }

    #[test]
    fn cannot_work_after_finish() {
        let mut txn = write_txn();
        txn.finish(TxState::Committed);

        let err = txn
            .stage_write("/t", "a", Data::rows(&b"x"[..]))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::TxTerminated {
                state: TxState::Committed,
                ..
            }
        ));
        assert!(txn.next_chunk("/t", |_| Ok(Vec::new())).is_err());
    }

    #[test]
    fn cursor_restarts_after_finished_chunk() {
        let mut txn = write_txn();
        let load = |_: SnapshotVersion| -> CoreResult<Vec<Data>> {
            Ok(vec![Data::rows(&b"1"[..]), Data::rows(&b"2"[..])])
        };

        assert_eq!(txn.next_chunk("/t", load).unwrap().chunk, 0);
        let last = txn.next_chunk("/t", load).unwrap();
        assert_eq!(last.chunk, 1);
        assert!(last.finished);
        assert_eq!(txn.open_cursor_count(), 0);

        assert_eq!(txn.next_chunk("/t", load).unwrap().chunk, 0);
    }

    #[test]
    fn cursor_loads_once() {
        let mut txn = write_txn();
        let mut loads = 0;
        for _ in 0..2 {
            txn.next_chunk("/t", |_| {
                loads += 1;
                Ok(vec![Data::rows(&b"1"[..]), Data::rows(&b"2"[..])])
            })
            .unwrap();
        }
        assert_eq!(loads, 1);
    }
}
