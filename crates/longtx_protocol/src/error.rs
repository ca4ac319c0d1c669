//! Error types for protocol encoding and decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not a valid protobuf encoding of the expected message.
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// An `Any` carried a different message than the one requested.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type URL the caller asked for.
        expected: String,
        /// Type URL found in the payload.
        actual: String,
    },

    /// A field required by the envelope is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The method code does not name a known RPC verb.
    #[error("unknown method code: {0}")]
    UnknownMethod(u8),
}

impl ProtocolError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_display() {
        let err = ProtocolError::type_mismatch("Ydb.LongTx.WriteResult", "Ydb.LongTx.ReadResult");
        let msg = err.to_string();
        assert!(msg.contains("WriteResult"));
        assert!(msg.contains("ReadResult"));
    }

    #[test]
    fn unknown_method_display() {
        assert_eq!(
            ProtocolError::UnknownMethod(42).to_string(),
            "unknown method code: 42"
        );
    }
}
