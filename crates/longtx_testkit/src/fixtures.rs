//! Service fixtures.
//!
//! Helpers here panic on unexpected failures so tests stay short; use the
//! `try_*` variants to inspect a failed operation.

use longtx_core::MemoryTableStore;
use longtx_protocol::{
    BeginTransactionRequest, BeginTransactionResult, CommitTransactionRequest, Data, Format,
    Operation, ReadRequest, ReadResult, RollbackTransactionRequest, TxTypeId, WriteRequest,
    WriteResult,
};
use longtx_server::{LongTxServer, ServerConfig};
use std::sync::Arc;

/// A long transaction service over an in-memory store.
pub struct TestService {
    /// The service under test.
    pub server: Arc<LongTxServer>,
    /// The backing store, for creating tables and inspecting data.
    pub store: Arc<MemoryTableStore>,
}

impl TestService {
    /// Creates a service with no tables.
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default(), std::iter::empty::<&str>())
    }

    /// Creates a service with the given empty tables.
    pub fn with_tables<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(ServerConfig::default(), paths)
    }

    /// Creates a service with a custom configuration.
    pub fn with_config<I, S>(config: ServerConfig, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Arc::new(MemoryTableStore::with_tables(paths));
        let server = Arc::new(LongTxServer::new(config, store.clone()));
        Self { server, store }
    }

    /// Begins a transaction and returns its id.
    pub fn begin(&self, tx_type: TxTypeId) -> String {
        let operation = self.try_begin(tx_type);
        expect_success(&operation, "begin");
        operation
            .unpack_result::<BeginTransactionResult>()
            .expect("begin result")
            .tx_id
    }

    /// Begins a transaction and returns the raw operation.
    pub fn try_begin(&self, tx_type: TxTypeId) -> Operation {
        take(
            self.server
                .begin_transaction(BeginTransactionRequest {
                    operation_params: None,
                    tx_type: tx_type as i32,
                })
                .operation,
        )
    }

    /// Writes a block and returns the result.
    pub fn write(&self, tx_id: &str, path: &str, dedup_id: &str, payload: &[u8]) -> WriteResult {
        let operation = self.try_write(tx_id, path, dedup_id, Some(Data::rows(payload.to_vec())));
        expect_success(&operation, "write");
        operation.unpack_result().expect("write result")
    }

    /// Writes an optional block and returns the raw operation.
    pub fn try_write(
        &self,
        tx_id: &str,
        path: &str,
        dedup_id: &str,
        data: Option<Data>,
    ) -> Operation {
        take(
            self.server
                .write(WriteRequest {
                    operation_params: None,
                    tx_id: tx_id.to_string(),
                    path: path.to_string(),
                    dedup_id: dedup_id.to_string(),
                    data,
                })
                .operation,
        )
    }

    /// Reads the next chunk and returns the result.
    pub fn read(&self, tx_id: &str, path: &str) -> ReadResult {
        let operation = self.try_read(tx_id, path);
        expect_success(&operation, "read");
        operation.unpack_result().expect("read result")
    }

    /// Reads the next chunk and returns the raw operation.
    pub fn try_read(&self, tx_id: &str, path: &str) -> Operation {
        take(
            self.server
                .read(ReadRequest {
                    operation_params: None,
                    tx_id: tx_id.to_string(),
                    path: path.to_string(),
                    query: None,
                })
                .operation,
        )
    }

    /// Reads chunks until the finished one.
    pub fn read_all(&self, tx_id: &str, path: &str) -> Vec<ReadResult> {
        let mut chunks = Vec::new();
        loop {
            let chunk = self.read(tx_id, path);
            let finished = chunk.finished;
            chunks.push(chunk);
            if finished {
                return chunks;
            }
        }
    }

    /// Reads the committed blocks of `path` in a fresh read transaction.
    ///
    /// The placeholder chunk of an empty table is not returned.
    pub fn read_all_from_new_tx(&self, path: &str) -> Vec<Data> {
        let tx_id = self.begin(TxTypeId::Read);
        let blocks = self
            .read_all(&tx_id, path)
            .into_iter()
            .filter_map(|chunk| chunk.data)
            .filter(|data| data.format_kind() != Some(Format::FormatUnspecified))
            .collect();
        self.commit(&tx_id);
        blocks
    }

    /// Commits a transaction.
    pub fn commit(&self, tx_id: &str) {
        expect_success(&self.try_commit(tx_id), "commit");
    }

    /// Commits a transaction and returns the raw operation.
    pub fn try_commit(&self, tx_id: &str) -> Operation {
        take(
            self.server
                .commit_transaction(CommitTransactionRequest {
                    operation_params: None,
                    tx_id: tx_id.to_string(),
                })
                .operation,
        )
    }

    /// Rolls a transaction back.
    pub fn rollback(&self, tx_id: &str) {
        expect_success(&self.try_rollback(tx_id), "rollback");
    }

    /// Rolls a transaction back and returns the raw operation.
    pub fn try_rollback(&self, tx_id: &str) -> Operation {
        take(
            self.server
                .rollback_transaction(RollbackTransactionRequest {
                    operation_params: None,
                    tx_id: tx_id.to_string(),
                })
                .operation,
        )
    }
}

impl Default for TestService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestService {
    type Target = LongTxServer;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

/// Runs a test against a fresh service with the given tables.
pub fn with_service<I, S, F, R>(paths: I, f: F) -> R
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: FnOnce(&TestService) -> R,
{
    let service = TestService::with_tables(paths);
    f(&service)
}

/// Panics with the operation's issues unless it succeeded.
pub fn expect_success(operation: &Operation, what: &str) {
    assert!(
        operation.is_success(),
        "{what} failed with {}: {}",
        operation.status().as_str_name(),
        operation.issue_text()
    );
}

fn take(operation: Option<Operation>) -> Operation {
    operation.expect("response carries an operation")
}
