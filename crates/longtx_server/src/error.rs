//! Error types for the long transaction server.

use longtx_core::CoreError;
use longtx_protocol::{IssueMessage, Operation, ProtocolError, StatusCode};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The transaction layer rejected the request.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request body could not be decoded.
    #[error("invalid request: {0}")]
    Protocol(#[from] ProtocolError),

    /// No retained operation has this id.
    #[error("operation not found: {0}")]
    OperationNotFound(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the wire status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Core(e) => e.status_code(),
            ServerError::Protocol(_) => StatusCode::BadRequest,
            ServerError::OperationNotFound(_) => StatusCode::NotFound,
            ServerError::Internal(_) => StatusCode::InternalError,
        }
    }

    /// Returns true if this is a client error.
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns true if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self.status_code(),
            StatusCode::InternalError | StatusCode::Overloaded | StatusCode::Unavailable
        )
    }

    /// Converts the error into a ready, failed operation.
    pub fn to_operation(&self) -> Operation {
        Operation::failure(self.status_code(), vec![IssueMessage::error(self.to_string())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longtx_core::{LongTxId, TxState};

    #[test]
    fn error_classification() {
        let id = LongTxId::generate();
        assert!(ServerError::from(CoreError::TxNotFound { id }).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(ServerError::from(CoreError::Overloaded { limit: 1 }).is_server_error());
        assert!(!ServerError::OperationNotFound("x".into()).is_server_error());
    }

    #[test]
    fn failure_operation_carries_issue() {
        let id = LongTxId::generate();
        let err = ServerError::from(CoreError::TxTerminated {
            id,
            state: TxState::Committed,
        });
        let op = err.to_operation();

        assert!(op.ready);
        assert_eq!(op.status(), StatusCode::PreconditionFailed);
        assert_eq!(op.issues.len(), 1);
        assert!(op.issues[0].message.contains("committed"));
        assert!(op.result.is_none());
    }

    #[test]
    fn decode_errors_are_bad_requests() {
        let err = ServerError::from(ProtocolError::UnknownMethod(9));
        assert_eq!(err.status_code(), StatusCode::BadRequest);
    }
}
