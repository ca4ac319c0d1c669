//! Asynchronous operation envelope.
//!
//! Every long transaction response carries an [`Operation`]. A ready
//! operation holds the final status, any issues, and the typed result
//! packed into an `Any`. A pending operation only holds its id; the client
//! polls it with [`GetOperationRequest`] until it is ready.

use crate::codec::{impl_wire_name, pack_any, unpack_any, WireName};
use crate::error::{ProtocolError, ProtocolResult};
use prost::Message;
use prost_types::{Any, Duration};
use std::collections::HashMap;

/// Issue severity for errors.
pub const SEVERITY_ERROR: u32 = 1;

/// Issue severity for warnings.
pub const SEVERITY_WARNING: u32 = 2;

/// Per-request operation parameters.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OperationParams {
    /// Synchronous or asynchronous execution.
    #[prost(enumeration = "OperationMode", tag = "1")]
    pub operation_mode: i32,
    /// Deadline for the operation to complete.
    #[prost(message, optional, tag = "2")]
    pub operation_timeout: Option<Duration>,
    /// Deadline after which the operation is cancelled.
    #[prost(message, optional, tag = "3")]
    pub cancel_after: Option<Duration>,
    /// User-defined labels.
    #[prost(map = "string, string", tag = "4")]
    pub labels: HashMap<String, String>,
    /// Whether to report cost info.
    #[prost(enumeration = "FeatureFlag", tag = "5")]
    pub report_cost_info: i32,
}

/// Execution mode requested by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OperationMode {
    /// Treated as synchronous.
    Unspecified = 0,
    /// The response carries a ready operation.
    Sync = 1,
    /// The response carries a pending operation to be polled.
    Async = 2,
}

/// Tri-state feature toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FeatureFlag {
    /// Server default.
    Unspecified = 0,
    /// Enabled.
    Enabled = 1,
    /// Disabled.
    Disabled = 2,
}

impl OperationParams {
    /// Creates parameters requesting asynchronous execution.
    pub fn asynchronous() -> Self {
        Self {
            operation_mode: OperationMode::Async as i32,
            ..Self::default()
        }
    }

    /// Returns true if the client asked for asynchronous execution.
    pub fn is_async(&self) -> bool {
        self.operation_mode() == OperationMode::Async
    }
}

/// Status of a finished operation.
///
/// Values match `Ydb.StatusIds.StatusCode`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusCode {
    /// Not set.
    StatusCodeUnspecified = 0,
    /// Operation succeeded.
    Success = 400000,
    /// Request is malformed.
    BadRequest = 400010,
    /// Caller is not authorized.
    Unauthorized = 400020,
    /// Unexpected server failure.
    InternalError = 400030,
    /// Operation was aborted.
    Aborted = 400040,
    /// Server is temporarily unavailable.
    Unavailable = 400050,
    /// Server is overloaded.
    Overloaded = 400060,
    /// Scheme object is missing or invalid.
    SchemeError = 400070,
    /// Generic failure.
    GenericError = 400080,
    /// Operation timed out.
    Timeout = 400090,
    /// Session is invalid.
    BadSession = 400100,
    /// Precondition for the operation does not hold.
    PreconditionFailed = 400120,
    /// Object already exists.
    AlreadyExists = 400130,
    /// Object was not found.
    NotFound = 400140,
    /// Session has expired.
    SessionExpired = 400150,
    /// Operation was cancelled.
    Cancelled = 400160,
    /// Outcome is unknown.
    Undetermined = 400170,
    /// Operation is not supported.
    Unsupported = 400180,
    /// Session is busy.
    SessionBusy = 400190,
}

impl StatusCode {
    /// Returns the protobuf enum value name.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            StatusCode::StatusCodeUnspecified => "STATUS_CODE_UNSPECIFIED",
            StatusCode::Success => "SUCCESS",
            StatusCode::BadRequest => "BAD_REQUEST",
            StatusCode::Unauthorized => "UNAUTHORIZED",
            StatusCode::InternalError => "INTERNAL_ERROR",
            StatusCode::Aborted => "ABORTED",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::Overloaded => "OVERLOADED",
            StatusCode::SchemeError => "SCHEME_ERROR",
            StatusCode::GenericError => "GENERIC_ERROR",
            StatusCode::Timeout => "TIMEOUT",
            StatusCode::BadSession => "BAD_SESSION",
            StatusCode::PreconditionFailed => "PRECONDITION_FAILED",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::SessionExpired => "SESSION_EXPIRED",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::Undetermined => "UNDETERMINED",
            StatusCode::Unsupported => "UNSUPPORTED",
            StatusCode::SessionBusy => "SESSION_BUSY",
        }
    }
}

/// A diagnostic attached to an operation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IssueMessage {
    /// Human-readable text.
    #[prost(string, tag = "2")]
    pub message: String,
    /// Machine-readable code.
    #[prost(uint32, tag = "4")]
    pub issue_code: u32,
    /// Severity, see [`SEVERITY_ERROR`].
    #[prost(uint32, tag = "5")]
    pub severity: u32,
    /// Nested issues.
    #[prost(message, repeated, tag = "6")]
    pub issues: Vec<IssueMessage>,
}

impl IssueMessage {
    /// Creates an error issue.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: SEVERITY_ERROR,
            ..Self::default()
        }
    }
}

/// An asynchronous operation handle.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Operation {
    /// Operation id, empty for operations that completed synchronously.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Whether the operation has finished.
    #[prost(bool, tag = "2")]
    pub ready: bool,
    /// Final status, only meaningful when ready.
    #[prost(enumeration = "StatusCode", tag = "3")]
    pub status: i32,
    /// Diagnostics.
    #[prost(message, repeated, tag = "4")]
    pub issues: Vec<IssueMessage>,
    /// Typed result.
    #[prost(message, optional, tag = "5")]
    pub result: Option<Any>,
    /// Operation metadata.
    #[prost(message, optional, tag = "6")]
    pub metadata: Option<Any>,
}

impl Operation {
    /// Creates a ready, successful operation carrying `result`.
    pub fn success<M: Message + WireName>(result: &M) -> Self {
        Self {
            ready: true,
            status: StatusCode::Success as i32,
            result: Some(pack_any(result)),
            ..Self::default()
        }
    }

    /// Creates a ready, failed operation.
    pub fn failure(status: StatusCode, issues: Vec<IssueMessage>) -> Self {
        Self {
            ready: true,
            status: status as i32,
            issues,
            ..Self::default()
        }
    }

    /// Creates a pending operation with the given id.
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ready: false,
            ..Self::default()
        }
    }

    /// Returns true if the operation finished with `SUCCESS`.
    pub fn is_success(&self) -> bool {
        self.ready && self.status() == StatusCode::Success
    }

    /// Unpacks the typed result.
    pub fn unpack_result<M: Message + Default + WireName>(&self) -> ProtocolResult<M> {
        let any = self
            .result
            .as_ref()
            .ok_or(ProtocolError::MissingField("operation.result"))?;
        unpack_any(any)
    }

    /// Joins the issue messages into a single line.
    pub fn issue_text(&self) -> String {
        self.issues
            .iter()
            .map(|issue| issue.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Polls an operation by id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetOperationRequest {
    /// Operation id.
    #[prost(string, tag = "1")]
    pub id: String,
}

/// Response to [`GetOperationRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetOperationResponse {
    /// The operation, ready once finished.
    #[prost(message, optional, tag = "1")]
    pub operation: Option<Operation>,
}

/// Discards a finished operation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForgetOperationRequest {
    /// Operation id.
    #[prost(string, tag = "1")]
    pub id: String,
}

/// Response to [`ForgetOperationRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForgetOperationResponse {
    /// Outcome of the forget call.
    #[prost(enumeration = "StatusCode", tag = "1")]
    pub status: i32,
    /// Diagnostics.
    #[prost(message, repeated, tag = "2")]
    pub issues: Vec<IssueMessage>,
}

impl_wire_name!(
    OperationParams => "Ydb.Operations.OperationParams",
    Operation => "Ydb.Operations.Operation",
    IssueMessage => "Ydb.Issue.IssueMessage",
    GetOperationRequest => "Ydb.Operations.GetOperationRequest",
    GetOperationResponse => "Ydb.Operations.GetOperationResponse",
    ForgetOperationRequest => "Ydb.Operations.ForgetOperationRequest",
    ForgetOperationResponse => "Ydb.Operations.ForgetOperationResponse",
);
