//! Request handlers for the long transaction verbs.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::operations::OperationRegistry;
use longtx_core::{LongTxId, ReadSelector, TransactionManager, TxType, WriteOutcome};
use longtx_protocol::{
    read_request, BeginTransactionRequest, BeginTransactionResult, CommitTransactionRequest,
    CommitTransactionResult, ForgetOperationRequest, ForgetOperationResponse,
    GetOperationRequest, GetOperationResponse, IssueMessage, Operation, ReadRequest, ReadResult,
    RollbackTransactionRequest, RollbackTransactionResult, StatusCode, WriteRequest, WriteResult,
};
use std::sync::Arc;
use tracing::debug;

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Transaction registry shared by all handlers.
    pub manager: Arc<TransactionManager>,
    /// Finished asynchronous operations.
    pub operations: OperationRegistry,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, manager: Arc<TransactionManager>) -> Self {
        let operations = OperationRegistry::new(config.max_retained_operations);
        Self {
            config,
            manager,
            operations,
        }
    }
}

/// Handler for long transaction requests.
///
/// Each method returns the typed result message of its verb; wrapping it
/// into an operation envelope is left to the caller.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a BeginTransaction request.
    pub fn handle_begin(
        &self,
        request: BeginTransactionRequest,
    ) -> ServerResult<BeginTransactionResult> {
        let tx_type = TxType::from_wire_value(request.tx_type)?;
        let handle = self.context.manager.begin(tx_type)?;
        Ok(BeginTransactionResult {
            tx_id: handle.id.to_string(),
        })
    }

    /// Handles a CommitTransaction request.
    pub fn handle_commit(
        &self,
        request: CommitTransactionRequest,
    ) -> ServerResult<CommitTransactionResult> {
        let id = LongTxId::parse(&request.tx_id)?;
        let outcome = self.context.manager.commit(&id)?;
        debug!(tx_id = %id, blocks = outcome.blocks, "commit handled");
        Ok(CommitTransactionResult {
            tx_id: request.tx_id,
        })
    }

    /// Handles a RollbackTransaction request.
    pub fn handle_rollback(
        &self,
        request: RollbackTransactionRequest,
    ) -> ServerResult<RollbackTransactionResult> {
        let id = LongTxId::parse(&request.tx_id)?;
        self.context.manager.rollback(&id)?;
        Ok(RollbackTransactionResult {
            tx_id: request.tx_id,
        })
    }

    /// Handles a Write request.
    ///
    /// A deduplicated retry succeeds with the same result as the first
    /// delivery.
    pub fn handle_write(&self, request: WriteRequest) -> ServerResult<WriteResult> {
        let id = LongTxId::parse(&request.tx_id)?;
        let outcome =
            self.context
                .manager
                .write(&id, &request.path, &request.dedup_id, request.data)?;
        if outcome == WriteOutcome::Duplicate {
            debug!(tx_id = %id, path = %request.path, dedup_id = %request.dedup_id, "duplicate write");
        }
        Ok(WriteResult {
            tx_id: request.tx_id,
            path: request.path,
            dedup_id: request.dedup_id,
        })
    }

    /// Handles a Read request.
    pub fn handle_read(&self, request: ReadRequest) -> ServerResult<ReadResult> {
        let id = LongTxId::parse(&request.tx_id)?;
        let selector = match request.query {
            Some(read_request::Query::Sql(sql)) => ReadSelector::Sql(sql),
            None => ReadSelector::Path,
        };
        let chunk = self.context.manager.read(&id, &request.path, &selector)?;
        Ok(ReadResult {
            tx_id: request.tx_id,
            path: request.path,
            chunk: chunk.chunk,
            finished: chunk.finished,
            data: Some(chunk.data),
        })
    }

    /// Handles a GetOperation request.
    ///
    /// Unknown ids yield a ready operation with `NOT_FOUND`.
    pub fn handle_get_operation(&self, request: GetOperationRequest) -> GetOperationResponse {
        let operation = match self.context.operations.get(&request.id) {
            Some(operation) => operation,
            None => {
                let mut operation =
                    ServerError::OperationNotFound(request.id.clone()).to_operation();
                operation.id = request.id;
                operation
            }
        };
        GetOperationResponse {
            operation: Some(operation),
        }
    }

    /// Handles a ForgetOperation request.
    pub fn handle_forget_operation(
        &self,
        request: ForgetOperationRequest,
    ) -> ForgetOperationResponse {
        if self.context.operations.forget(&request.id) {
            return ForgetOperationResponse {
                status: StatusCode::Success as i32,
                issues: Vec::new(),
            };
        }
        let err = ServerError::OperationNotFound(request.id);
        ForgetOperationResponse {
            status: err.status_code() as i32,
            issues: vec![IssueMessage::error(err.to_string())],
        }
    }

    /// Retains a finished operation for later polling and returns its id.
    pub fn retain_operation(&self, operation: Operation) -> String {
        self.context.operations.retain(operation)
    }
}
