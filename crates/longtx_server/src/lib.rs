//! # Long Transaction Server
//!
//! Service layer for the `Ydb.LongTx` API.
//!
//! This crate provides:
//! - `LongTxServer`: one entry point per verb, each answering with an
//!   operation envelope (status, issues, packed result)
//! - Dispatch of encoded request bodies by method code
//! - Asynchronous operation mode with `GetOperation` / `ForgetOperation`
//! - A tokio task that expires idle transactions
//!
//! # Architecture
//!
//! The server is transport agnostic. An RPC front end decodes the method
//! name, calls [`LongTxServer::handle_bytes`] (or a typed method) and
//! writes the returned bytes back. All transaction state lives in the
//! shared [`longtx_core::TransactionManager`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod operations;
mod reaper;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use operations::{OperationRegistry, OPERATION_ID_PREFIX};
pub use reaper::spawn_reaper;
pub use server::LongTxServer;
