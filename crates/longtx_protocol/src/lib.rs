//! # Long Transaction Protocol
//!
//! Wire messages and protobuf codecs for the long transaction API.
//!
//! This crate provides:
//! - `Data` blocks tagged with a payload format
//! - Request, response and result messages for the five RPC verbs
//!   (BeginTransaction, CommitTransaction, RollbackTransaction, Write, Read)
//! - The asynchronous operation envelope (`Operation`, `OperationParams`,
//!   `StatusCode`, `IssueMessage`)
//! - Protobuf encoding/decoding and `Any` packing helpers
//!
//! Field numbers and enum values match the `Ydb.LongTx` proto3 schema, so
//! payloads produced here are byte-compatible with existing clients.
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod data;
mod error;
mod messages;
mod operation;

pub use codec::{decode, encode, pack_any, unpack_any, WireName};
pub use data::{Data, Format};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    read_request, BeginTransactionRequest, BeginTransactionResponse, BeginTransactionResult,
    CommitTransactionRequest, CommitTransactionResponse, CommitTransactionResult, LongTxMethod,
    LongTxRequest, LongTxResponse, ReadRequest, ReadResponse, ReadResult,
    RollbackTransactionRequest, RollbackTransactionResponse, RollbackTransactionResult,
    TxTypeId, WriteRequest, WriteResponse, WriteResult,
};
pub use operation::{
    FeatureFlag, ForgetOperationRequest, ForgetOperationResponse, GetOperationRequest,
    GetOperationResponse, IssueMessage, Operation, OperationMode, OperationParams, StatusCode,
    SEVERITY_ERROR, SEVERITY_WARNING,
};

/// Protobuf package of the long transaction messages.
pub const LONG_TX_PACKAGE: &str = "Ydb.LongTx";

/// Protobuf package of the operation envelope messages.
pub const OPERATIONS_PACKAGE: &str = "Ydb.Operations";
