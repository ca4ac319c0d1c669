//! Long transaction service.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use longtx_core::{LongTxId, MemoryTableStore, TableStore, TransactionManager};
use longtx_protocol::{
    BeginTransactionRequest, BeginTransactionResponse, CommitTransactionRequest,
    CommitTransactionResponse, ForgetOperationRequest, ForgetOperationResponse,
    GetOperationRequest, GetOperationResponse, LongTxMethod, LongTxRequest, LongTxResponse,
    Operation, OperationParams, ReadRequest, ReadResponse, RollbackTransactionRequest,
    RollbackTransactionResponse, WireName, WriteRequest, WriteResponse,
};
use prost::Message;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The long transaction service.
///
/// Every verb returns its response message with an operation envelope;
/// failures never surface as `Err` but as a ready operation carrying a
/// non-success status and an issue.
///
/// # Example
///
/// ```
/// use longtx_protocol::{BeginTransactionRequest, BeginTransactionResult, TxTypeId};
/// use longtx_server::{LongTxServer, ServerConfig};
///
/// let server = LongTxServer::in_memory(ServerConfig::default());
/// let response = server.begin_transaction(BeginTransactionRequest {
///     operation_params: None,
///     tx_type: TxTypeId::Read as i32,
/// });
/// let operation = response.operation.unwrap();
/// assert!(operation.is_success());
/// let result: BeginTransactionResult = operation.unpack_result().unwrap();
/// assert!(result.tx_id.starts_with("ydb://long-tx/"));
/// ```
pub struct LongTxServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl LongTxServer {
    /// Creates a server over the given table store.
    pub fn new(config: ServerConfig, store: Arc<dyn TableStore>) -> Self {
        let manager = Arc::new(TransactionManager::new(config.core.clone(), store));
        Self::with_manager(config, manager)
    }

    /// Creates a server over an empty in-memory store.
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::new(config, Arc::new(MemoryTableStore::new()))
    }

    /// Creates a server sharing an existing transaction registry.
    pub fn with_manager(config: ServerConfig, manager: Arc<TransactionManager>) -> Self {
        let context = Arc::new(HandlerContext::new(config, manager));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Returns the transaction registry.
    pub fn manager(&self) -> &Arc<TransactionManager> {
        &self.context.manager
    }

    /// Handles a BeginTransaction request.
    pub fn begin_transaction(&self, request: BeginTransactionRequest) -> BeginTransactionResponse {
        let params = request.operation_params.clone();
        let result = self.handler.handle_begin(request);
        BeginTransactionResponse {
            operation: Some(self.complete(LongTxMethod::BeginTransaction, params, result)),
        }
    }

    /// Handles a CommitTransaction request.
    pub fn commit_transaction(&self, request: CommitTransactionRequest) -> CommitTransactionResponse {
        let params = request.operation_params.clone();
        let result = self.handler.handle_commit(request);
        CommitTransactionResponse {
            operation: Some(self.complete(LongTxMethod::CommitTransaction, params, result)),
        }
    }

    /// Handles a RollbackTransaction request.
    pub fn rollback_transaction(
        &self,
        request: RollbackTransactionRequest,
    ) -> RollbackTransactionResponse {
        let params = request.operation_params.clone();
        let result = self.handler.handle_rollback(request);
        RollbackTransactionResponse {
            operation: Some(self.complete(LongTxMethod::RollbackTransaction, params, result)),
        }
    }

    /// Handles a Write request.
    pub fn write(&self, request: WriteRequest) -> WriteResponse {
        let params = request.operation_params.clone();
        let result = self.handler.handle_write(request);
        WriteResponse {
            operation: Some(self.complete(LongTxMethod::Write, params, result)),
        }
    }

    /// Handles a Read request.
    pub fn read(&self, request: ReadRequest) -> ReadResponse {
        let params = request.operation_params.clone();
        let result = self.handler.handle_read(request);
        ReadResponse {
            operation: Some(self.complete(LongTxMethod::Read, params, result)),
        }
    }

    /// Handles a request for any verb.
    pub fn handle(&self, request: LongTxRequest) -> LongTxResponse {
        match request {
            LongTxRequest::BeginTransaction(req) => {
                LongTxResponse::BeginTransaction(self.begin_transaction(req))
            }
            LongTxRequest::CommitTransaction(req) => {
                LongTxResponse::CommitTransaction(self.commit_transaction(req))
            }
            LongTxRequest::RollbackTransaction(req) => {
                LongTxResponse::RollbackTransaction(self.rollback_transaction(req))
            }
            LongTxRequest::Write(req) => LongTxResponse::Write(self.write(req)),
            LongTxRequest::Read(req) => LongTxResponse::Read(self.read(req)),
        }
    }

    /// Handles an encoded request body and returns the encoded response.
    ///
    /// An unknown method code is an error. A body that fails to decode is
    /// answered with a `BAD_REQUEST` operation.
    pub fn handle_bytes(&self, method_code: u8, body: &[u8]) -> ServerResult<Vec<u8>> {
        let method = LongTxMethod::from_code(method_code)?;
        let response = match LongTxRequest::decode(method, body) {
            Ok(request) => self.handle(request),
            Err(err) => {
                let err = ServerError::from(err);
                warn!(method = method.name(), error = %err, "undecodable request");
                LongTxResponse::from_operation(method, err.to_operation())
            }
        };
        Ok(response.encode())
    }

    /// Polls an asynchronous operation.
    pub fn get_operation(&self, request: GetOperationRequest) -> GetOperationResponse {
        self.handler.handle_get_operation(request)
    }

    /// Discards an asynchronous operation.
    pub fn forget_operation(&self, request: ForgetOperationRequest) -> ForgetOperationResponse {
        self.handler.handle_forget_operation(request)
    }

    /// Expires transactions that stayed idle past the configured timeout.
    pub fn reap_expired(&self) -> Vec<LongTxId> {
        self.context.manager.reap_expired(Instant::now())
    }

    /// Wraps a handler result into an operation envelope.
    ///
    /// Asynchronous calls run to completion here as well; the finished
    /// operation is retained and a pending one carrying its id is returned.
    fn complete<M>(
        &self,
        method: LongTxMethod,
        params: Option<OperationParams>,
        result: ServerResult<M>,
    ) -> Operation
    where
        M: Message + WireName,
    {
        let operation = match result {
            Ok(message) => Operation::success(&message),
            Err(err) => {
                let status = err.status_code().as_str_name();
                if err.is_server_error() {
                    error!(method = method.name(), status, error = %err, "request failed");
                } else {
                    info!(method = method.name(), status, error = %err, "request rejected");
                }
                err.to_operation()
            }
        };

        if params.as_ref().is_some_and(OperationParams::is_async) {
            let id = self.handler.retain_operation(operation);
            return Operation::pending(id);
        }
        operation
    }
}
