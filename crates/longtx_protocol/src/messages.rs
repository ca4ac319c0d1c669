//! Request, response and result messages of the long transaction API.

use crate::codec::{decode, encode, impl_wire_name};
use crate::data::Data;
use crate::error::{ProtocolError, ProtocolResult};
use crate::operation::{Operation, OperationParams};

/// Kind of transaction requested by [`BeginTransactionRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TxTypeId {
    /// Not set; rejected by the server.
    Unspecified = 0,
    /// Transaction that appends data.
    Write = 1,
    /// Transaction that reads a snapshot.
    Read = 2,
}

/// Starts a long transaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BeginTransactionRequest {
    /// Operation parameters.
    #[prost(message, optional, tag = "1")]
    pub operation_params: Option<OperationParams>,
    /// Transaction kind.
    #[prost(enumeration = "TxTypeId", tag = "2")]
    pub tx_type: i32,
}

/// Result of [`BeginTransactionRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BeginTransactionResult {
    /// Id of the new transaction.
    #[prost(string, tag = "1")]
    pub tx_id: String,
}

/// Response to [`BeginTransactionRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BeginTransactionResponse {
    /// Operation carrying a [`BeginTransactionResult`].
    #[prost(message, optional, tag = "1")]
    pub operation: Option<Operation>,
}

/// Commits a long transaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitTransactionRequest {
    /// Operation parameters.
    #[prost(message, optional, tag = "1")]
    pub operation_params: Option<OperationParams>,
    /// Transaction to commit.
    #[prost(string, tag = "2")]
    pub tx_id: String,
}

/// Result of [`CommitTransactionRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitTransactionResult {
    /// Committed transaction.
    #[prost(string, tag = "1")]
    pub tx_id: String,
}

/// Response to [`CommitTransactionRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitTransactionResponse {
    /// Operation carrying a [`CommitTransactionResult`].
    #[prost(message, optional, tag = "1")]
    pub operation: Option<Operation>,
}

/// Rolls back a long transaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackTransactionRequest {
    /// Operation parameters.
    #[prost(message, optional, tag = "1")]
    pub operation_params: Option<OperationParams>,
    /// Transaction to roll back.
    #[prost(string, tag = "2")]
    pub tx_id: String,
}

/// Result of [`RollbackTransactionRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackTransactionResult {
    /// Rolled back transaction.
    #[prost(string, tag = "1")]
    pub tx_id: String,
}

/// Response to [`RollbackTransactionRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackTransactionResponse {
    /// Operation carrying a [`RollbackTransactionResult`].
    #[prost(message, optional, tag = "1")]
    pub operation: Option<Operation>,
}

/// Appends a data block to a table within a write transaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRequest {
    /// Operation parameters.
    #[prost(message, optional, tag = "1")]
    pub operation_params: Option<OperationParams>,
    /// Transaction the write belongs to.
    #[prost(string, tag = "2")]
    pub tx_id: String,
    /// Target table path.
    #[prost(string, tag = "3")]
    pub path: String,
    /// Idempotency key, scoped to (tx_id, path).
    #[prost(string, tag = "4")]
    pub dedup_id: String,
    /// Data to append.
    #[prost(message, optional, tag = "5")]
    pub data: Option<Data>,
}

/// Result of [`WriteRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteResult {
    /// Transaction the write belongs to.
    #[prost(string, tag = "1")]
    pub tx_id: String,
    /// Target table path.
    #[prost(string, tag = "2")]
    pub path: String,
    /// Idempotency key of the write.
    #[prost(string, tag = "3")]
    pub dedup_id: String,
}

/// Response to [`WriteRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteResponse {
    /// Operation carrying a [`WriteResult`].
    #[prost(message, optional, tag = "1")]
    pub operation: Option<Operation>,
}

/// Reads the next chunk of a table within a transaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadRequest {
    /// Operation parameters.
    #[prost(message, optional, tag = "1")]
    pub operation_params: Option<OperationParams>,
    /// Transaction the read belongs to.
    #[prost(string, tag = "2")]
    pub tx_id: String,
    /// Source table path.
    #[prost(string, tag = "3")]
    pub path: String,
    /// Optional query narrowing the read.
    #[prost(oneof = "read_request::Query", tags = "11")]
    pub query: Option<read_request::Query>,
}

/// Nested types of [`ReadRequest`].
pub mod read_request {
    /// Query narrowing a read.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Query {
        /// SQL text.
        #[prost(string, tag = "11")]
        Sql(String),
    }
}

/// One chunk of a read.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadResult {
    /// Transaction the read belongs to.
    #[prost(string, tag = "1")]
    pub tx_id: String,
    /// Source table path.
    #[prost(string, tag = "2")]
    pub path: String,
    /// Chunk number, starting from 0.
    #[prost(uint64, tag = "3")]
    pub chunk: u64,
    /// True on the last chunk.
    #[prost(bool, tag = "4")]
    pub finished: bool,
    /// Chunk payload.
    #[prost(message, optional, tag = "5")]
    pub data: Option<Data>,
}

/// Response to [`ReadRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadResponse {
    /// Operation carrying a [`ReadResult`].
    #[prost(message, optional, tag = "1")]
    pub operation: Option<Operation>,
}

impl_wire_name!(
    BeginTransactionRequest => "Ydb.LongTx.BeginTransactionRequest",
    BeginTransactionResult => "Ydb.LongTx.BeginTransactionResult",
    BeginTransactionResponse => "Ydb.LongTx.BeginTransactionResponse",
    CommitTransactionRequest => "Ydb.LongTx.CommitTransactionRequest",
    CommitTransactionResult => "Ydb.LongTx.CommitTransactionResult",
    CommitTransactionResponse => "Ydb.LongTx.CommitTransactionResponse",
    RollbackTransactionRequest => "Ydb.LongTx.RollbackTransactionRequest",
    RollbackTransactionResult => "Ydb.LongTx.RollbackTransactionResult",
    RollbackTransactionResponse => "Ydb.LongTx.RollbackTransactionResponse",
    WriteRequest => "Ydb.LongTx.WriteRequest",
    WriteResult => "Ydb.LongTx.WriteResult",
    WriteResponse => "Ydb.LongTx.WriteResponse",
    ReadRequest => "Ydb.LongTx.ReadRequest",
    ReadResult => "Ydb.LongTx.ReadResult",
    ReadResponse => "Ydb.LongTx.ReadResponse",
);

/// The RPC verbs of the long transaction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LongTxMethod {
    /// BeginTransaction.
    BeginTransaction,
    /// CommitTransaction.
    CommitTransaction,
    /// RollbackTransaction.
    RollbackTransaction,
    /// Write.
    Write,
    /// Read.
    Read,
}

impl LongTxMethod {
    /// All methods in code order.
    pub const ALL: [LongTxMethod; 5] = [
        LongTxMethod::BeginTransaction,
        LongTxMethod::CommitTransaction,
        LongTxMethod::RollbackTransaction,
        LongTxMethod::Write,
        LongTxMethod::Read,
    ];

    /// Returns the method code.
    pub fn code(&self) -> u8 {
        match self {
            LongTxMethod::BeginTransaction => 1,
            LongTxMethod::CommitTransaction => 2,
            LongTxMethod::RollbackTransaction => 3,
            LongTxMethod::Write => 4,
            LongTxMethod::Read => 5,
        }
    }

    /// Converts from a method code.
    pub fn from_code(code: u8) -> ProtocolResult<Self> {
        match code {
            1 => Ok(LongTxMethod::BeginTransaction),
            2 => Ok(LongTxMethod::CommitTransaction),
            3 => Ok(LongTxMethod::RollbackTransaction),
            4 => Ok(LongTxMethod::Write),
            5 => Ok(LongTxMethod::Read),
            _ => Err(ProtocolError::UnknownMethod(code)),
        }
    }

    /// Returns the RPC method name.
    pub fn name(&self) -> &'static str {
        match self {
            LongTxMethod::BeginTransaction => "BeginTransaction",
            LongTxMethod::CommitTransaction => "CommitTransaction",
            LongTxMethod::RollbackTransaction => "RollbackTransaction",
            LongTxMethod::Write => "Write",
            LongTxMethod::Read => "Read",
        }
    }

    /// Looks up a method by RPC name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.name().eq_ignore_ascii_case(name))
    }
}

/// A decoded request for any verb.
#[derive(Debug, Clone, PartialEq)]
pub enum LongTxRequest {
    /// BeginTransaction request.
    BeginTransaction(BeginTransactionRequest),
    /// CommitTransaction request.
    CommitTransaction(CommitTransactionRequest),
    /// RollbackTransaction request.
    RollbackTransaction(RollbackTransactionRequest),
    /// Write request.
    Write(WriteRequest),
    /// Read request.
    Read(ReadRequest),
}

impl LongTxRequest {
    /// Returns the verb of this request.
    pub fn method(&self) -> LongTxMethod {
        match self {
            LongTxRequest::BeginTransaction(_) => LongTxMethod::BeginTransaction,
            LongTxRequest::CommitTransaction(_) => LongTxMethod::CommitTransaction,
            LongTxRequest::RollbackTransaction(_) => LongTxMethod::RollbackTransaction,
            LongTxRequest::Write(_) => LongTxMethod::Write,
            LongTxRequest::Read(_) => LongTxMethod::Read,
        }
    }

    /// Returns the operation parameters, if the client sent any.
    pub fn operation_params(&self) -> Option<&OperationParams> {
        match self {
            LongTxRequest::BeginTransaction(req) => req.operation_params.as_ref(),
            LongTxRequest::CommitTransaction(req) => req.operation_params.as_ref(),
            LongTxRequest::RollbackTransaction(req) => req.operation_params.as_ref(),
            LongTxRequest::Write(req) => req.operation_params.as_ref(),
            LongTxRequest::Read(req) => req.operation_params.as_ref(),
        }
    }

    /// Encodes the request body.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            LongTxRequest::BeginTransaction(req) => encode(req),
            LongTxRequest::CommitTransaction(req) => encode(req),
            LongTxRequest::RollbackTransaction(req) => encode(req),
            LongTxRequest::Write(req) => encode(req),
            LongTxRequest::Read(req) => encode(req),
        }
    }

    /// Decodes a request body for the given verb.
    pub fn decode(method: LongTxMethod, bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(match method {
            LongTxMethod::BeginTransaction => LongTxRequest::BeginTransaction(decode(bytes)?),
            LongTxMethod::CommitTransaction => LongTxRequest::CommitTransaction(decode(bytes)?),
            LongTxMethod::RollbackTransaction => {
                LongTxRequest::RollbackTransaction(decode(bytes)?)
            }
            LongTxMethod::Write => LongTxRequest::Write(decode(bytes)?),
            LongTxMethod::Read => LongTxRequest::Read(decode(bytes)?),
        })
    }
}

/// A response for any verb.
#[derive(Debug, Clone, PartialEq)]
pub enum LongTxResponse {
    /// BeginTransaction response.
    BeginTransaction(BeginTransactionResponse),
    /// CommitTransaction response.
    CommitTransaction(CommitTransactionResponse),
    /// RollbackTransaction response.
    RollbackTransaction(RollbackTransactionResponse),
    /// Write response.
    Write(WriteResponse),
    /// Read response.
    Read(ReadResponse),
}

impl LongTxResponse {
    /// Returns the verb of this response.
    pub fn method(&self) -> LongTxMethod {
        match self {
            LongTxResponse::BeginTransaction(_) => LongTxMethod::BeginTransaction,
            LongTxResponse::CommitTransaction(_) => LongTxMethod::CommitTransaction,
            LongTxResponse::RollbackTransaction(_) => LongTxMethod::RollbackTransaction,
            LongTxResponse::Write(_) => LongTxMethod::Write,
            LongTxResponse::Read(_) => LongTxMethod::Read,
        }
    }

    /// Wraps an operation in the response message for `method`.
    pub fn from_operation(method: LongTxMethod, operation: Operation) -> Self {
        let operation = Some(operation);
        match method {
            LongTxMethod::BeginTransaction => {
                LongTxResponse::BeginTransaction(BeginTransactionResponse { operation })
            }
            LongTxMethod::CommitTransaction => {
                LongTxResponse::CommitTransaction(CommitTransactionResponse { operation })
            }
            LongTxMethod::RollbackTransaction => {
                LongTxResponse::RollbackTransaction(RollbackTransactionResponse { operation })
            }
            LongTxMethod::Write => LongTxResponse::Write(WriteResponse { operation }),
            LongTxMethod::Read => LongTxResponse::Read(ReadResponse { operation }),
        }
    }

    /// Returns the operation carried by the response.
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            LongTxResponse::BeginTransaction(resp) => resp.operation.as_ref(),
            LongTxResponse::CommitTransaction(resp) => resp.operation.as_ref(),
            LongTxResponse::RollbackTransaction(resp) => resp.operation.as_ref(),
            LongTxResponse::Write(resp) => resp.operation.as_ref(),
            LongTxResponse::Read(resp) => resp.operation.as_ref(),
        }
    }

    /// Encodes the response body.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            LongTxResponse::BeginTransaction(resp) => encode(resp),
            LongTxResponse::CommitTransaction(resp) => encode(resp),
            LongTxResponse::RollbackTransaction(resp) => encode(resp),
            LongTxResponse::Write(resp) => encode(resp),
            LongTxResponse::Read(resp) => encode(resp),
        }
    }

    /// Decodes a response body for the given verb.
    pub fn decode(method: LongTxMethod, bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(match method {
            LongTxMethod::BeginTransaction => LongTxResponse::BeginTransaction(decode(bytes)?),
            LongTxMethod::CommitTransaction => LongTxResponse::CommitTransaction(decode(bytes)?),
            LongTxMethod::RollbackTransaction => {
                LongTxResponse::RollbackTransaction(decode(bytes)?)
            }
            LongTxMethod::Write => LongTxResponse::Write(decode(bytes)?),
            LongTxMethod::Read => LongTxResponse::Read(decode(bytes)?),
        })
    }
}
