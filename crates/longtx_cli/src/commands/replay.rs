//! Replay command implementation.
//!
//! A script is a JSON document with a list of steps:
//!
//! ```json
//! {
//!   "steps": [
//!     { "op": "create_table", "path": "/Root/events" },
//!     { "op": "begin", "tx": "w", "type": "write" },
//!     { "op": "write", "tx": "w", "path": "/Root/events", "payload": "row-1" },
//!     { "op": "commit", "tx": "w" },
//!     { "op": "begin", "tx": "r", "type": "read" },
//!     { "op": "read_all", "tx": "r", "path": "/Root/events" },
//!     { "op": "commit", "tx": "r", "expect": "SUCCESS" }
//!   ]
//! }
//! ```
//!
//! `tx` names a script-local alias bound by `begin`. An unbound alias is
//! sent verbatim as the transaction id.

use super::CliError;
use bytes::Bytes;
use longtx_core::MemoryTableStore;
use longtx_protocol::{
    BeginTransactionRequest, BeginTransactionResult, CommitTransactionRequest, Data, Format,
    Operation, ReadRequest, ReadResult, RollbackTransactionRequest, TxTypeId, WriteRequest,
};
use longtx_server::{LongTxServer, ServerConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upper bound on chunks fetched by one `read_all` step.
const MAX_READ_ALL_CHUNKS: usize = 100_000;

/// A replay script.
#[derive(Debug, Deserialize)]
pub struct Script {
    /// Steps, run in order.
    pub steps: Vec<Step>,
}

/// Transaction type named in a script.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptTxType {
    /// Write transaction.
    Write,
    /// Read transaction.
    Read,
}

/// Payload format named in a script.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptFormat {
    /// Row-encoded batch.
    #[default]
    Rows,
    /// Apache Arrow batch.
    Arrow,
    /// No format; rejected by the service.
    Unspecified,
}

/// One script step.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Creates an empty table in the store.
    CreateTable {
        /// Table path.
        path: String,
    },
    /// Begins a transaction and binds it to `tx`.
    Begin {
        /// Alias to bind.
        tx: String,
        /// Transaction type.
        #[serde(rename = "type")]
        tx_type: ScriptTxType,
        /// Expected status name.
        #[serde(default)]
        expect: Option<String>,
    },
    /// Writes one block.
    Write {
        /// Transaction alias.
        tx: String,
        /// Table path.
        path: String,
        /// Dedup id.
        #[serde(default)]
        dedup_id: String,
        /// Payload format.
        #[serde(default)]
        format: ScriptFormat,
        /// Payload text, or hex digits when `hex` is set.
        payload: String,
        /// Treat `payload` as hex.
        #[serde(default)]
        hex: bool,
        /// Expected status name.
        #[serde(default)]
        expect: Option<String>,
    },
    /// Reads one chunk.
    Read {
        /// Transaction alias.
        tx: String,
        /// Table path.
        path: String,
        /// Expected status name.
        #[serde(default)]
        expect: Option<String>,
    },
    /// Reads chunks until the finished one.
    ReadAll {
        /// Transaction alias.
        tx: String,
        /// Table path.
        path: String,
        /// Expected status name.
        #[serde(default)]
        expect: Option<String>,
    },
    /// Commits a transaction.
    Commit {
        /// Transaction alias.
        tx: String,
        /// Expected status name.
        #[serde(default)]
        expect: Option<String>,
    },
    /// Rolls a transaction back.
    Rollback {
        /// Transaction alias.
        tx: String,
        /// Expected status name.
        #[serde(default)]
        expect: Option<String>,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::CreateTable { .. } => "create_table",
            Step::Begin { .. } => "begin",
            Step::Write { .. } => "write",
            Step::Read { .. } => "read",
            Step::ReadAll { .. } => "read_all",
            Step::Commit { .. } => "commit",
            Step::Rollback { .. } => "rollback",
        }
    }

    fn expect(&self) -> Option<&str> {
        match self {
            Step::CreateTable { .. } => None,
            Step::Begin { expect, .. }
            | Step::Write { expect, .. }
            | Step::Read { expect, .. }
            | Step::ReadAll { expect, .. }
            | Step::Commit { expect, .. }
            | Step::Rollback { expect, .. } => expect.as_deref(),
        }
    }
}

/// Outcome of a replay.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    /// One entry per step.
    pub steps: Vec<StepReport>,
}

impl ReplayReport {
    /// Returns the number of steps whose status differed from `expect`.
    pub fn mismatches(&self) -> usize {
        self.steps.iter().filter(|step| step.matched == Some(false)).count()
    }
}

/// Outcome of one step.
#[derive(Debug, Serialize)]
pub struct StepReport {
    /// Zero-based step index.
    pub index: usize,
    /// Step name.
    pub op: &'static str,
    /// Status name of the last operation.
    pub status: String,
    /// Transaction id the step addressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    /// Joined issue messages.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issues: String,
    /// Chunks returned by read steps.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<ChunkReport>,
    /// Whether the status matched `expect`, if one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
}

/// A chunk returned by a read step.
#[derive(Debug, Serialize)]
pub struct ChunkReport {
    /// Chunk number.
    pub chunk: u64,
    /// True on the last chunk.
    pub finished: bool,
    /// Payload format name.
    pub format: &'static str,
    /// Payload size in bytes.
    pub size: usize,
    /// Payload, lossily decoded as UTF-8.
    pub payload: String,
}

impl From<ReadResult> for ChunkReport {
    fn from(result: ReadResult) -> Self {
        let data = result.data.unwrap_or_default();
        Self {
            chunk: result.chunk,
            finished: result.finished,
            format: data
                .format_kind()
                .map_or("UNKNOWN", |format| format.as_str_name()),
            size: data.len(),
            payload: String::from_utf8_lossy(&data.data).into_owned(),
        }
    }
}

/// Runs the replay command.
pub fn run(
    script_path: &Path,
    format: &str,
    idle_timeout_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(script_path)?;
    let script: Script = serde_json::from_str(&text)?;

    let mut config = ServerConfig::default();
    if let Some(ms) = idle_timeout_ms {
        config = config.with_idle_timeout(Duration::from_millis(ms));
    }

    let report = execute(&script, config)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    let count = report.mismatches();
    if count > 0 {
        return Err(CliError::ExpectationFailed { count }.into());
    }
    Ok(())
}

/// Runs every step of `script` against a fresh in-process service.
pub fn execute(script: &Script, config: ServerConfig) -> Result<ReplayReport, CliError> {
    let store = Arc::new(MemoryTableStore::new());
    let mut runner = Runner {
        server: LongTxServer::new(config, store.clone()),
        store,
        aliases: HashMap::new(),
    };

    let mut steps = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let mut report = runner.run_step(index, step)?;
        report.matched = step.expect().map(|expected| expected == report.status);
        debug!(index, op = report.op, status = %report.status, "step done");
        steps.push(report);
    }
    Ok(ReplayReport { steps })
}

struct Runner {
    server: LongTxServer,
    store: Arc<MemoryTableStore>,
    aliases: HashMap<String, String>,
}

impl Runner {
    fn resolve(&self, alias: &str) -> String {
        self.aliases
            .get(alias)
            .cloned()
            .unwrap_or_else(|| alias.to_string())
    }

    fn run_step(&mut self, index: usize, step: &Step) -> Result<StepReport, CliError> {
        let mut report = StepReport {
            index,
            op: step.name(),
            status: "SUCCESS".to_string(),
            tx_id: None,
            issues: String::new(),
            chunks: Vec::new(),
            matched: None,
        };

        let operation = match step {
            Step::CreateTable { path } => {
                if !self.store.create_table(path.clone()) {
                    report.status = "ALREADY_EXISTS".to_string();
                }
                return Ok(report);
            }
            Step::Begin { tx, tx_type, .. } => {
                let tx_type = match tx_type {
                    ScriptTxType::Write => TxTypeId::Write,
                    ScriptTxType::Read => TxTypeId::Read,
                };
                let operation = take(
                    self.server
                        .begin_transaction(BeginTransactionRequest {
                            operation_params: None,
                            tx_type: tx_type as i32,
                        })
                        .operation,
                );
                if let Ok(result) = operation.unpack_result::<BeginTransactionResult>() {
                    self.aliases.insert(tx.clone(), result.tx_id.clone());
                    report.tx_id = Some(result.tx_id);
                }
                operation
            }
            Step::Write {
                tx,
                path,
                dedup_id,
                format,
                payload,
                hex,
                ..
            } => {
                let bytes = if *hex {
                    parse_hex(payload).map_err(|message| CliError::InvalidStep { index, message })?
                } else {
                    payload.clone().into_bytes()
                };
                let format = match format {
                    ScriptFormat::Rows => Format::YdbRows,
                    ScriptFormat::Arrow => Format::ApacheArrow,
                    ScriptFormat::Unspecified => Format::FormatUnspecified,
                };
                let tx_id = self.resolve(tx);
                report.tx_id = Some(tx_id.clone());
                take(
                    self.server
                        .write(WriteRequest {
                            operation_params: None,
                            tx_id,
                            path: path.clone(),
                            dedup_id: dedup_id.clone(),
                            data: Some(Data::with_format(format, Bytes::from(bytes))),
                        })
                        .operation,
                )
            }
            Step::Read { tx, path, .. } => {
                let tx_id = self.resolve(tx);
                report.tx_id = Some(tx_id.clone());
                let operation = self.read(&tx_id, path);
                if let Ok(result) = operation.unpack_result::<ReadResult>() {
                    report.chunks.push(result.into());
                }
                operation
            }
            Step::ReadAll { tx, path, .. } => {
                let tx_id = self.resolve(tx);
                report.tx_id = Some(tx_id.clone());
                let mut last = None;
                for _ in 0..MAX_READ_ALL_CHUNKS {
                    let operation = self.read(&tx_id, path);
                    let finished = match operation.unpack_result::<ReadResult>() {
                        Ok(result) if operation.is_success() => {
                            let finished = result.finished;
                            report.chunks.push(result.into());
                            finished
                        }
                        _ => true,
                    };
                    last = Some(operation);
                    if finished {
                        break;
                    }
                }
                last.ok_or_else(|| CliError::InvalidStep {
                    index,
                    message: "read_all returned no chunks".to_string(),
                })?
            }
            Step::Commit { tx, .. } => {
                let tx_id = self.resolve(tx);
                report.tx_id = Some(tx_id.clone());
                take(
                    self.server
                        .commit_transaction(CommitTransactionRequest {
                            operation_params: None,
                            tx_id,
                        })
                        .operation,
                )
            }
            Step::Rollback { tx, .. } => {
                let tx_id = self.resolve(tx);
                report.tx_id = Some(tx_id.clone());
                take(
                    self.server
                        .rollback_transaction(RollbackTransactionRequest {
                            operation_params: None,
                            tx_id,
                        })
                        .operation,
                )
            }
        };

        report.status = operation.status().as_str_name().to_string();
        report.issues = operation.issue_text();
        Ok(report)
    }

    fn read(&self, tx_id: &str, path: &str) -> Operation {
        take(
            self.server
                .read(ReadRequest {
                    operation_params: None,
                    tx_id: tx_id.to_string(),
                    path: path.to_string(),
                    query: None,
                })
                .operation,
        )
    }
}

fn take(operation: Option<Operation>) -> Operation {
    operation.unwrap_or_default()
}

fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err("hex payload has an odd number of digits".to_string());
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = pair[0].to_digit(16);
            let lo = pair[1].to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                _ => Err(format!("invalid hex digits: {}{}", pair[0], pair[1])),
            }
        })
        .collect()
}

fn print_text_output(report: &ReplayReport) {
    for step in &report.steps {
        let marker = match step.matched {
            Some(true) => " [ok]",
            Some(false) => " [UNEXPECTED]",
            None => "",
        };
        match &step.tx_id {
            Some(tx_id) => println!(
                "#{:<3} {:<12} {:<20} {}{}",
                step.index, step.op, step.status, tx_id, marker
            ),
            None => println!(
                "#{:<3} {:<12} {}{}",
                step.index, step.op, step.status, marker
            ),
        }
        if !step.issues.is_empty() {
            println!("       issues: {}", step.issues);
        }
        for chunk in &step.chunks {
            println!(
                "       chunk {}{} {} {} bytes: {}",
                chunk.chunk,
                if chunk.finished { " (finished)" } else { "" },
                chunk.format,
                chunk.size,
                chunk.payload
            );
        }
    }
}
