//! Transaction registry.

use crate::channel::{validate_path, ReadChunk, ReadSelector, WriteOutcome};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::store::TableStore;
use crate::transaction::state::LongTransaction;
use crate::types::{LongTxId, SnapshotVersion, TxState, TxType};
use longtx_protocol::{Data, Format};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A freshly begun transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongTxHandle {
    /// Transaction id.
    pub id: LongTxId,
    /// Transaction type.
    pub tx_type: TxType,
    /// Snapshot version reads observe.
    pub snapshot: SnapshotVersion,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Store version created by the commit, `None` if nothing was written.
    pub version: Option<SnapshotVersion>,
    /// Number of blocks applied.
    pub blocks: usize,
}

/// Terminated ids, remembered so late calls get a precise error.
#[derive(Debug, Default)]
struct Tombstones {
    states: HashMap<LongTxId, TxState>,
    order: VecDeque<LongTxId>,
}

impl Tombstones {
    fn insert(&mut self, id: LongTxId, state: TxState, limit: usize) {
        if self.states.insert(id, state).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > limit {
            if let Some(oldest) = self.order.pop_front() {
                self.states.remove(&oldest);
            }
        }
    }

    fn get(&self, id: &LongTxId) -> Option<TxState> {
        self.states.get(id).copied()
    }
}

/// Registry of long transactions.
///
/// The manager provides:
/// - Unique, never reused transaction ids
/// - Exactly one terminal transition per transaction (commit, rollback or
///   expiry), even under concurrent calls
/// - Atomic application of a write transaction's staged blocks on commit
/// - Snapshot reads: a transaction reads the store as of its begin
///
/// ## Locking
///
/// The id map is behind a read-write lock; each transaction has its own
/// mutex, so calls on different transactions proceed in parallel. Terminal
/// transitions happen with the transaction's mutex held.
pub struct TransactionManager {
    config: CoreConfig,
    store: Arc<dyn TableStore>,
    active: RwLock<HashMap<LongTxId, Arc<Mutex<LongTransaction>>>>,
    tombstones: Mutex<Tombstones>,
}

impl TransactionManager {
    /// Creates a new transaction manager over `store`.
    pub fn new(config: CoreConfig, store: Arc<dyn TableStore>) -> Self {
        Self {
            config,
            store,
            active: RwLock::new(HashMap::new()),
            tombstones: Mutex::new(Tombstones::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Returns the table store.
    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// Returns the number of active transactions.
    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    /// Returns the state of a transaction, if it is known.
    pub fn state_of(&self, id: &LongTxId) -> Option<TxState> {
        if let Some(entry) = self.active.read().get(id) {
            return Some(entry.lock().state());
        }
        self.tombstones.lock().get(id)
    }

    /// Begins a new transaction.
    pub fn begin(&self, tx_type: TxType) -> CoreResult<LongTxHandle> {
        let mut active = self.active.write();
        if active.len() >= self.config.max_active_transactions {
            warn!(
                limit = self.config.max_active_transactions,
                "rejecting begin: too many active transactions"
            );
            return Err(CoreError::Overloaded {
                limit: self.config.max_active_transactions,
            });
        }

        let id = loop {
            let candidate = LongTxId::generate();
            if !active.contains_key(&candidate) && self.tombstones.lock().get(&candidate).is_none()
            {
                break candidate;
            }
        };
        let snapshot = self.store.current_version();
        active.insert(
            id,
            Arc::new(Mutex::new(LongTransaction::new(id, tx_type, snapshot))),
        );
        drop(active);

        info!(tx_id = %id, tx_type = %tx_type, %snapshot, "long transaction started");
        Ok(LongTxHandle {
            id,
            tx_type,
            snapshot,
        })
    }

    /// Commits a transaction.
    ///
    /// For write transactions all staged blocks are applied to the store
    /// atomically, ordered by path and then by write order. If the store
    /// rejects the batch the transaction is rolled back and the store error
    /// is returned.
    pub fn commit(&self, id: &LongTxId) -> CoreResult<CommitOutcome> {
        let entry = self.lookup(id)?;
        let mut txn = entry.lock();
        txn.ensure_active()?;

        let batch = txn.take_staged();
        let blocks: usize = batch.iter().map(|(_, b)| b.len()).sum();
        let version = if batch.is_empty() {
            None
        } else {
            match self.store.apply(batch) {
                Ok(version) => Some(version),
                Err(e) => {
                    warn!(tx_id = %id, error = %e, "commit failed, rolling back");
                    txn.finish(TxState::RolledBack);
                    drop(txn);
                    self.retire(id, TxState::RolledBack);
                    return Err(e);
                }
            }
        };

        txn.finish(TxState::Committed);
        drop(txn);
        self.retire(id, TxState::Committed);

        info!(tx_id = %id, blocks, version = ?version, "long transaction committed");
        Ok(CommitOutcome { version, blocks })
    }

    /// Rolls back a transaction, discarding its staged writes.
    pub fn rollback(&self, id: &LongTxId) -> CoreResult<()> {
        let entry = self.lookup(id)?;
        let mut txn = entry.lock();
        txn.ensure_active()?;

        let discarded = txn.staged_block_count();
        txn.finish(TxState::RolledBack);
        drop(txn);
        self.retire(id, TxState::RolledBack);

        info!(tx_id = %id, discarded, "long transaction rolled back");
        Ok(())
    }

    /// Stages a block for `path` within a write transaction.
    ///
    /// The transaction itself is checked before the arguments: a terminated
    /// or read-only transaction is reported as such whatever the payload.
    ///
    /// A non-empty `dedup_id` makes the write idempotent within
    /// (transaction, path): a retry with identical data is reported as
    /// [`WriteOutcome::Duplicate`] and staged only once.
    pub fn write(
        &self,
        id: &LongTxId,
        path: &str,
        dedup_id: &str,
        data: Option<Data>,
    ) -> CoreResult<WriteOutcome> {
        let entry = self.lookup(id)?;
        let mut txn = entry.lock();
        txn.ensure_active()?;
        txn.ensure_writable()?;

        validate_path(path)?;
        let data = data.ok_or_else(|| CoreError::invalid_argument("data is missing"))?;
        match data.format_kind() {
            Some(Format::YdbRows) | Some(Format::ApacheArrow) => {}
            Some(Format::FormatUnspecified) => {
                return Err(CoreError::invalid_argument("data format is not specified"));
            }
            None => {
                return Err(CoreError::invalid_argument(format!(
                    "unknown data format: {}",
                    data.format
                )));
            }
        }
        if data.len() > self.config.max_write_bytes {
            return Err(CoreError::PayloadTooLarge {
                size: data.len(),
                limit: self.config.max_write_bytes,
            });
        }

        if !self.store.table_exists(path) {
            return Err(CoreError::table_not_found(path));
        }

        let size = data.len();
        let outcome = txn.stage_write(path, dedup_id, data)?;
        debug!(tx_id = %id, path, dedup_id, size, outcome = ?outcome, "write staged");
        Ok(outcome)
    }

    /// Returns the next chunk of `path` as seen by the transaction's
    /// snapshot.
    ///
    /// Successive calls for the same path return chunks 0, 1, ... until the
    /// chunk marked finished; the call after that starts over.
    pub fn read(
        &self,
        id: &LongTxId,
        path: &str,
        selector: &ReadSelector,
    ) -> CoreResult<ReadChunk> {
        let entry = self.lookup(id)?;
        let mut txn = entry.lock();
        txn.ensure_active()?;

        if let ReadSelector::Sql(_) = selector {
            return Err(CoreError::unsupported("sql queries in long transaction reads"));
        }
        validate_path(path)?;
        if !self.store.table_exists(path) {
            return Err(CoreError::table_not_found(path));
        }

        let chunk = txn.next_chunk(path, |snapshot| self.store.read_blocks(path, snapshot))?;
        debug!(
            tx_id = %id,
            path,
            chunk = chunk.chunk,
            finished = chunk.finished,
            "read chunk"
        );
        Ok(chunk)
    }

    /// Expires transactions idle longer than the configured timeout.
    ///
    /// Transactions busy with another call are skipped. Returns the ids that
    /// were expired.
    pub fn reap_expired(&self, now: Instant) -> Vec<LongTxId> {
        let candidates: Vec<_> = self
            .active
            .read()
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect();

        let mut expired = Vec::new();
        for (id, entry) in candidates {
            let Some(mut txn) = entry.try_lock() else {
                continue;
            };
            if !txn.is_active() || txn.idle_for(now) < self.config.idle_timeout {
                continue;
            }
            let discarded = txn.staged_block_count();
            txn.finish(TxState::Expired);
            drop(txn);
            self.retire(&id, TxState::Expired);

            warn!(tx_id = %id, discarded, "long transaction expired");
            expired.push(id);
        }
        expired
    }

    fn lookup(&self, id: &LongTxId) -> CoreResult<Arc<Mutex<LongTransaction>>> {
        if let Some(entry) = self.active.read().get(id) {
            return Ok(Arc::clone(entry));
        }
        match self.tombstones.lock().get(id) {
            Some(state) => Err(CoreError::TxTerminated { id: *id, state }),
            None => Err(CoreError::TxNotFound { id: *id }),
        }
    }

    fn retire(&self, id: &LongTxId, state: TxState) {
        // Tombstone before removal so a concurrent lookup never sees neither.
        self.tombstones
            .lock()
            .insert(*id, state, self.config.max_tombstones);
        self.active.write().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTableStore;
    use std::time::Duration;

    const EVENTS: &str = "/Root/events";

    fn create_manager() -> (TransactionManager, Arc<MemoryTableStore>) {
        create_manager_with(CoreConfig::default())
    }

    fn create_manager_with(config: CoreConfig) -> (TransactionManager, Arc<MemoryTableStore>) {
        let store = Arc::new(MemoryTableStore::with_tables([EVENTS]));
        let manager = TransactionManager::new(config, Arc::clone(&store) as Arc<dyn TableStore>);
        (manager, store)
    }

    fn rows(payload: &'static [u8]) -> Option<Data> {
        Some(Data::rows(payload))
    }

    #[test]
    fn begin_issues_unique_ids() {
        let (manager, _) = create_manager();
        let a = manager.begin(TxType::Write).unwrap();
        let b = manager.begin(TxType::Read).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(manager.active_count(), 2);
        assert_eq!(manager.state_of(&a.id), Some(TxState::Active));
    }

    #[test]
    fn commit_applies_staged_writes() {
        let (manager, store) = create_manager();
        let tx = manager.begin(TxType::Write).unwrap();

        manager.write(&tx.id, EVENTS, "1", rows(b"a")).unwrap();
        manager.write(&tx.id, EVENTS, "2", rows(b"b")).unwrap();
        assert_eq!(store.block_count(EVENTS), 0);

        let outcome = manager.commit(&tx.id).unwrap();
        assert_eq!(outcome.blocks, 2);
        assert_eq!(outcome.version, Some(SnapshotVersion::new(1)));
        assert_eq!(store.block_count(EVENTS), 2);
        assert_eq!(manager.active_count(), 0);
        assert_eq!(manager.state_of(&tx.id), Some(TxState::Committed));
    }

    #[test]
    fn commit_without_writes_creates_no_version() {
        let (manager, store) = create_manager();
        let tx = manager.begin(TxType::Write).unwrap();
        let outcome = manager.commit(&tx.id).unwrap();
        assert_eq!(outcome.version, None);
        assert_eq!(store.current_version(), SnapshotVersion::new(0));
    }

    #[test]
    fn only_one_terminal_transition() {
        let (manager, _) = create_manager();
        let tx = manager.begin(TxType::Write).unwrap();
        manager.commit(&tx.id).unwrap();

        assert!(matches!(
            manager.commit(&tx.id),
            Err(CoreError::TxTerminated {
                state: TxState::Committed,
                ..
            })
        ));
        assert!(matches!(
            manager.rollback(&tx.id),
            Err(CoreError::TxTerminated { .. })
        ));
        assert!(matches!(
            manager.write(&tx.id, EVENTS, "x", rows(b"x")),
            Err(CoreError::TxTerminated { .. })
        ));
    }

    #[test]
    fn rollback_discards_writes() {
        let (manager, store) = create_manager();
        let tx = manager.begin(TxType::Write).unwrap();
        manager.write(&tx.id, EVENTS, "1", rows(b"a")).unwrap();
        manager.rollback(&tx.id).unwrap();

        assert_eq!(store.block_count(EVENTS), 0);
        assert_eq!(manager.state_of(&tx.id), Some(TxState::RolledBack));
        assert!(manager.read(&tx.id, EVENTS, &ReadSelector::Path).is_err());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (manager, _) = create_manager();
        let err = manager.commit(&LongTxId::generate()).unwrap_err();
        assert!(matches!(err, CoreError::TxNotFound { .. }));
    }

    #[test]
    fn dedup_applies_once() {
        let (manager, store) = create_manager();
        let tx = manager.begin(TxType::Write).unwrap();

        assert_eq!(
            manager.write(&tx.id, EVENTS, "batch", rows(b"a")).unwrap(),
            WriteOutcome::Applied
        );
        assert_eq!(
            manager.write(&tx.id, EVENTS, "batch", rows(b"a")).unwrap(),
            WriteOutcome::Duplicate
        );
        manager.commit(&tx.id).unwrap();
        assert_eq!(store.block_count(EVENTS), 1);
    }

    #[test]
    fn dedup_is_scoped_to_transaction() {
        let (manager, store) = create_manager();
        let a = manager.begin(TxType::Write).unwrap();
        let b = manager.begin(TxType::Write).unwrap();

        manager.write(&a.id, EVENTS, "batch", rows(b"a")).unwrap();
        assert_eq!(
            manager.write(&b.id, EVENTS, "batch", rows(b"a")).unwrap(),
            WriteOutcome::Applied
        );
        manager.commit(&a.id).unwrap();
        manager.commit(&b.id).unwrap();
        assert_eq!(store.block_count(EVENTS), 2);
    }

    #[test]
    fn write_validation() {
        let (manager, _) = create_manager_with(CoreConfig::new().max_write_bytes(4));
        let tx = manager.begin(TxType::Write).unwrap();

        assert!(matches!(
            manager.write(&tx.id, EVENTS, "1", None),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(matches!(
            manager.write(&tx.id, EVENTS, "1", Some(Data::default())),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(matches!(
            manager.write(
                &tx.id,
                EVENTS,
                "1",
                Some(Data {
                    format: 2,
                    data: bytes::Bytes::new()
                })
            ),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(matches!(
            manager.write(&tx.id, EVENTS, "1", rows(b"too long")),
            Err(CoreError::PayloadTooLarge { size: 8, limit: 4 })
        ));
        assert!(matches!(
            manager.write(&tx.id, "/Root/missing", "1", rows(b"x")),
            Err(CoreError::TableNotFound { .. })
        ));
        assert!(matches!(
            manager.write(&tx.id, "relative", "1", rows(b"x")),
            Err(CoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn read_transaction_cannot_write() {
        let (manager, _) = create_manager();
        let tx = manager.begin(TxType::Read).unwrap();
        assert!(matches!(
            manager.write(&tx.id, EVENTS, "1", rows(b"x")),
            Err(CoreError::ReadOnlyTransaction { .. })
        ));
    }

    #[test]
    fn transaction_checked_before_arguments() {
        let (manager, _) = create_manager();
        let done = manager.begin(TxType::Write).unwrap();
        manager.commit(&done.id).unwrap();
        assert!(matches!(
            manager.write(&done.id, "relative", "1", None),
            Err(CoreError::TxTerminated { .. })
        ));
        assert!(matches!(
            manager.read(&done.id, EVENTS, &ReadSelector::Sql("SELECT 1".into())),
            Err(CoreError::TxTerminated { .. })
        ));

        let reader = manager.begin(TxType::Read).unwrap();
        assert!(matches!(
            manager.write(&reader.id, "/Root/missing", "1", None),
            Err(CoreError::ReadOnlyTransaction { .. })
        ));
    }

    #[test]
    fn dedup_is_scoped_to_path() {
        let (manager, store) = create_manager();
        store.create_table("/Root/other");
        let tx = manager.begin(TxType::Write).unwrap();

        assert_eq!(
            manager.write(&tx.id, EVENTS, "batch", rows(b"a")).unwrap(),
            WriteOutcome::Applied
        );
        assert_eq!(
            manager.write(&tx.id, "/Root/other", "batch", rows(b"a")).unwrap(),
            WriteOutcome::Applied
        );
        manager.commit(&tx.id).unwrap();
        assert_eq!(store.block_count(EVENTS), 1);
        assert_eq!(store.block_count("/Root/other"), 1);
    }

    #[test]
    fn read_sees_snapshot_at_begin() {
        let (manager, _) = create_manager();

        let w1 = manager.begin(TxType::Write).unwrap();
        manager.write(&w1.id, EVENTS, "1", rows(b"first")).unwrap();
        manager.commit(&w1.id).unwrap();

        let reader = manager.begin(TxType::Read).unwrap();

        let w2 = manager.begin(TxType::Write).unwrap();
        manager.write(&w2.id, EVENTS, "1", rows(b"second")).unwrap();
        manager.commit(&w2.id).unwrap();

        let chunk = manager.read(&reader.id, EVENTS, &ReadSelector::Path).unwrap();
        assert_eq!(chunk.chunk, 0);
        assert!(chunk.finished);
        assert_eq!(chunk.data.data.as_ref(), b"first");
    }

    #[test]
    fn uncommitted_writes_are_invisible() {
        let (manager, _) = create_manager();
        let writer = manager.begin(TxType::Write).unwrap();
        manager.write(&writer.id, EVENTS, "1", rows(b"x")).unwrap();

        let reader = manager.begin(TxType::Read).unwrap();
        let chunk = manager.read(&reader.id, EVENTS, &ReadSelector::Path).unwrap();
        assert!(chunk.finished);
        assert!(chunk.data.is_empty());
    }

    #[test]
    fn read_chunks_increase() {
        let (manager, _) = create_manager();
        for payload in [&b"a"[..], &b"b"[..], &b"c"[..]] {
            let tx = manager.begin(TxType::Write).unwrap();
            manager.write(&tx.id, EVENTS, "", Some(Data::rows(payload))).unwrap();
            manager.commit(&tx.id).unwrap();
        }

        let reader = manager.begin(TxType::Read).unwrap();
        let mut seen = Vec::new();
        loop {
            let chunk = manager.read(&reader.id, EVENTS, &ReadSelector::Path).unwrap();
            seen.push(chunk.chunk);
            if chunk.finished {
                break;
            }
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn sql_reads_are_unsupported() {
        let (manager, _) = create_manager();
        let tx = manager.begin(TxType::Read).unwrap();
        let err = manager
            .read(&tx.id, EVENTS, &ReadSelector::Sql("SELECT 1".into()))
            .unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { .. }));
    }

    #[test]
    fn commit_failure_rolls_back() {
        let (manager, store) = create_manager();
        let tx = manager.begin(TxType::Write).unwrap();
        manager.write(&tx.id, EVENTS, "1", rows(b"a")).unwrap();
        store.drop_table(EVENTS);

        assert!(matches!(
            manager.commit(&tx.id),
            Err(CoreError::TableNotFound { .. })
        ));
        assert_eq!(manager.state_of(&tx.id), Some(TxState::RolledBack));
    }

    #[test]
    fn begin_respects_active_limit() {
        let (manager, _) = create_manager_with(CoreConfig::new().max_active_transactions(1));
        let tx = manager.begin(TxType::Write).unwrap();
        assert!(matches!(
            manager.begin(TxType::Write),
            Err(CoreError::Overloaded { limit: 1 })
        ));
        manager.rollback(&tx.id).unwrap();
        assert!(manager.begin(TxType::Write).is_ok());
    }

    #[test]
    fn reaper_expires_idle_transactions() {
        let (manager, store) =
            create_manager_with(CoreConfig::new().idle_timeout(Duration::from_secs(60)));
        let idle = manager.begin(TxType::Write).unwrap();
        manager.write(&idle.id, EVENTS, "1", rows(b"a")).unwrap();

        assert!(manager.reap_expired(Instant::now()).is_empty());

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(manager.reap_expired(later), vec![idle.id]);
        assert_eq!(manager.state_of(&idle.id), Some(TxState::Expired));
        assert!(matches!(
            manager.commit(&idle.id),
            Err(CoreError::TxTerminated {
                state: TxState::Expired,
                ..
            })
        ));
        assert_eq!(store.block_count(EVENTS), 0);
    }

    #[test]
    fn tombstones_are_bounded() {
        let (manager, _) = create_manager_with(CoreConfig::new().max_tombstones(1));
        let first = manager.begin(TxType::Read).unwrap();
        let second = manager.begin(TxType::Read).unwrap();
        manager.commit(&first.id).unwrap();
        manager.commit(&second.id).unwrap();

        // The oldest tombstone was evicted; the id is still rejected.
        assert_eq!(manager.state_of(&first.id), None);
        assert!(matches!(
            manager.commit(&first.id),
            Err(CoreError::TxNotFound { .. })
        ));
        assert_eq!(manager.state_of(&second.id), Some(TxState::Committed));
    }

    #[test]
    fn concurrent_terminal_transitions() {
        let (manager, store) = create_manager();
        let manager = Arc::new(manager);
        let tx = manager.begin(TxType::Write).unwrap();
        manager.write(&tx.id, EVENTS, "1", rows(b"a")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = Arc::clone(&manager);
                let id = tx.id;
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        manager.commit(&id).is_ok()
                    } else {
                        manager.rollback(&id).is_ok()
                    }
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert!(store.block_count(EVENTS) <= 1);
    }
}
