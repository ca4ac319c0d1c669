//! CLI command implementations.

pub mod decode;
pub mod replay;

use thiserror::Error;

/// Errors raised by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// The method name is not a long transaction verb.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// The message kind is not request, response or result.
    #[error("unknown message kind: {0} (expected request, response or result)")]
    UnknownKind(String),

    /// A script step is malformed.
    #[error("step {index}: {message}")]
    InvalidStep {
        /// Zero-based step index.
        index: usize,
        /// What is wrong with it.
        message: String,
    },

    /// Steps finished with a status other than the expected one.
    #[error("{count} step(s) did not match their expected status")]
    ExpectationFailed {
        /// Number of mismatching steps.
        count: usize,
    },

    /// The body could not be decoded.
    #[error(transparent)]
    Protocol(#[from] longtx_protocol::ProtocolError),
}
