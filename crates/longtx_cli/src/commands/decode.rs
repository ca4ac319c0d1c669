//! Decode command implementation.

use super::CliError;
use longtx_protocol::{
    decode, BeginTransactionResult, CommitTransactionResult, LongTxMethod, LongTxRequest,
    LongTxResponse, Operation, ReadResult, RollbackTransactionResult, WriteResult,
};
use std::path::Path;

/// Which message of a verb a body holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// `<Verb>Request`.
    Request,
    /// `<Verb>Response`, the operation envelope.
    Response,
    /// `<Verb>Result`, the payload packed into the envelope.
    Result,
}

impl MessageKind {
    fn parse(kind: &str) -> Result<Self, CliError> {
        match kind.to_ascii_lowercase().as_str() {
            "request" => Ok(MessageKind::Request),
            "response" => Ok(MessageKind::Response),
            "result" => Ok(MessageKind::Result),
            _ => Err(CliError::UnknownKind(kind.to_string())),
        }
    }
}

/// Runs the decode command.
pub fn run(method: &str, kind: &str, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(file)?;
    println!("{}", describe(method, kind, &bytes)?);
    Ok(())
}

/// Decodes `bytes` as the `kind` message of `method` and renders it.
pub fn describe(method: &str, kind: &str, bytes: &[u8]) -> Result<String, CliError> {
    let method =
        LongTxMethod::from_name(method).ok_or_else(|| CliError::UnknownMethod(method.to_string()))?;
    match MessageKind::parse(kind)? {
        MessageKind::Request => Ok(format!("{:#?}", LongTxRequest::decode(method, bytes)?)),
        MessageKind::Response => {
            let response = LongTxResponse::decode(method, bytes)?;
            match response.operation() {
                Some(operation) => describe_operation(method, operation),
                None => Ok("operation: <missing>".to_string()),
            }
        }
        MessageKind::Result => describe_result(method, bytes),
    }
}

fn describe_operation(method: LongTxMethod, operation: &Operation) -> Result<String, CliError> {
    let mut out = String::new();
    if !operation.id.is_empty() {
        out.push_str(&format!("id: {}\n", operation.id));
    }
    out.push_str(&format!("ready: {}\n", operation.ready));
    out.push_str(&format!("status: {}\n", operation.status().as_str_name()));
    for issue in &operation.issues {
        out.push_str(&format!("issue: {}\n", issue.message));
    }
    if let Some(any) = &operation.result {
        out.push_str(&format!("result ({}):\n", any.type_url));
        out.push_str(&describe_result(method, &any.value)?);
    }
    Ok(out.trim_end().to_string())
}

fn describe_result(method: LongTxMethod, bytes: &[u8]) -> Result<String, CliError> {
    Ok(match method {
        LongTxMethod::BeginTransaction => format!("{:#?}", decode::<BeginTransactionResult>(bytes)?),
        LongTxMethod::CommitTransaction => {
            format!("{:#?}", decode::<CommitTransactionResult>(bytes)?)
        }
        LongTxMethod::RollbackTransaction => {
            format!("{:#?}", decode::<RollbackTransactionResult>(bytes)?)
        }
        LongTxMethod::Write => format!("{:#?}", decode::<WriteResult>(bytes)?),
        LongTxMethod::Read => format!("{:#?}", decode::<ReadResult>(bytes)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use longtx_protocol::{encode, IssueMessage, StatusCode, WriteRequest};
    use std::io::Write;

    #[test]
    fn describes_request() {
        let request = WriteRequest {
            tx_id: "ydb://long-tx/abc".into(),
            path: "/Root/t".into(),
            ..WriteRequest::default()
        };
        let text = describe("write", "request", &encode(&request)).unwrap();
        assert!(text.contains("/Root/t"));
        assert!(text.contains("ydb://long-tx/abc"));
    }

    #[test]
    fn describes_successful_response() {
        let result = CommitTransactionResult {
            tx_id: "ydb://long-tx/abc".into(),
        };
        let response = LongTxResponse::from_operation(
            LongTxMethod::CommitTransaction,
            Operation::success(&result),
        );
        let text = describe("CommitTransaction", "response", &response.encode()).unwrap();
        assert!(text.contains("status: SUCCESS"));
        assert!(text.contains("Ydb.LongTx.CommitTransactionResult"));
        assert!(text.contains("ydb://long-tx/abc"));
    }

    #[test]
    fn describes_failed_response() {
        let response = LongTxResponse::from_operation(
            LongTxMethod::Read,
            Operation::failure(StatusCode::NotFound, vec![IssueMessage::error("gone")]),
        );
        let text = describe("read", "response", &response.encode()).unwrap();
        assert!(text.contains("status: NOT_FOUND"));
        assert!(text.contains("issue: gone"));
    }

    #[test]
    fn rejects_unknown_method_and_kind() {
        assert!(matches!(
            describe("Scan", "request", &[]),
            Err(CliError::UnknownMethod(_))
        ));
        assert!(matches!(
            describe("Read", "envelope", &[]),
            Err(CliError::UnknownKind(_))
        ));
    }

    #[test]
    fn rejects_garbage_body() {
        assert!(matches!(
            describe("Read", "result", &[0xFF]),
            Err(CliError::Protocol(_))
        ));
    }

    #[test]
    fn run_reads_body_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encode(&WriteResult::default())).unwrap();
        assert!(run("Write", "result", file.path()).is_ok());
    }
}
