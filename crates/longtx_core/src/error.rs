//! Error types for the long transaction core.

use crate::types::{LongTxId, TxState};
use longtx_protocol::StatusCode;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in long transaction operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The transaction id is not in the expected format.
    #[error("invalid transaction id: {value:?}")]
    InvalidTxId {
        /// The rejected value.
        value: String,
    },

    /// No transaction with this id is known.
    #[error("transaction not found: {id}")]
    TxNotFound {
        /// The unknown id.
        id: LongTxId,
    },

    /// The transaction has already reached a terminal state.
    #[error("transaction {id} is already {state}")]
    TxTerminated {
        /// The transaction id.
        id: LongTxId,
        /// Its terminal state.
        state: TxState,
    },

    /// A request argument is malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// A write was sent to a read transaction.
    #[error("transaction {id} is read-only")]
    ReadOnlyTransaction {
        /// The transaction id.
        id: LongTxId,
    },

    /// The target table does not exist.
    #[error("table not found: {path}")]
    TableNotFound {
        /// The table path.
        path: String,
    },

    /// A dedup id was reused with a different payload.
    #[error("dedup id {dedup_id:?} was already used for different data at {path}")]
    DedupConflict {
        /// The table path.
        path: String,
        /// The reused dedup id.
        dedup_id: String,
    },

    /// The write payload exceeds the configured limit.
    #[error("payload too large: {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The request uses a feature this service does not provide.
    #[error("unsupported: {message}")]
    Unsupported {
        /// Description of the feature.
        message: String,
    },

    /// Too many transactions are active.
    #[error("too many active transactions (limit {limit})")]
    Overloaded {
        /// Configured limit.
        limit: usize,
    },

    /// The table store failed.
    #[error("store error: {message}")]
    Store {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an unsupported feature error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(path: impl Into<String>) -> Self {
        Self::TableNotFound { path: path.into() }
    }

    /// Creates a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Returns the wire status reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::InvalidTxId { .. }
            | CoreError::InvalidArgument { .. }
            | CoreError::ReadOnlyTransaction { .. }
            | CoreError::PayloadTooLarge { .. } => StatusCode::BadRequest,
            CoreError::TxNotFound { .. } => StatusCode::NotFound,
            CoreError::TxTerminated { .. } | CoreError::DedupConflict { .. } => {
                StatusCode::PreconditionFailed
            }
            CoreError::TableNotFound { .. } => StatusCode::SchemeError,
            CoreError::Unsupported { .. } => StatusCode::Unsupported,
            CoreError::Overloaded { .. } => StatusCode::Overloaded,
            CoreError::Store { .. } => StatusCode::InternalError,
        }
    }
}
