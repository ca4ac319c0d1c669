//! Property-based test generators using proptest.
//!
//! Strategies produce values that are valid on the wire; semantic validity
//! (existing tables, live transactions) is up to the test.

use bytes::Bytes;
use longtx_core::LONG_TX_ID_PREFIX;
use longtx_protocol::{
    read_request, Data, Format, IssueMessage, OperationMode, OperationParams, ReadRequest,
    ReadResult, StatusCode, WriteRequest,
};
use proptest::prelude::*;

/// Strategy for generating absolute table paths.
pub fn table_path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("/Root(/[a-z][a-z0-9_]{0,7}){1,3}").expect("Invalid regex")
}

/// Strategy for generating dedup ids, including the empty one.
pub fn dedup_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9-]{0,16}").expect("Invalid regex")
}

/// Strategy for generating well-formed transaction ids.
pub fn tx_id_strategy() -> impl Strategy<Value = String> {
    prop::array::uniform16(any::<u8>()).prop_map(|bytes| {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        format!("{LONG_TX_ID_PREFIX}{hex}")
    })
}

/// Strategy for generating writable data formats.
pub fn format_strategy() -> impl Strategy<Value = Format> {
    prop_oneof![Just(Format::YdbRows), Just(Format::ApacheArrow)]
}

/// Strategy for generating payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for generating writable data blocks.
pub fn data_strategy() -> impl Strategy<Value = Data> {
    (format_strategy(), payload_strategy())
        .prop_map(|(format, payload)| Data::with_format(format, Bytes::from(payload)))
}

/// Strategy for generating operation parameters.
pub fn operation_params_strategy() -> impl Strategy<Value = OperationParams> {
    (
        prop_oneof![
            Just(OperationMode::Unspecified),
            Just(OperationMode::Sync),
            Just(OperationMode::Async),
        ],
        prop::option::of(0i64..3600),
        prop::collection::hash_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..3),
    )
        .prop_map(|(mode, timeout_secs, labels)| OperationParams {
            operation_mode: mode as i32,
            operation_timeout: timeout_secs.map(|seconds| prost_types::Duration {
                seconds,
                nanos: 0,
            }),
            cancel_after: None,
            labels,
            report_cost_info: 0,
        })
}

/// Strategy for generating write requests.
pub fn write_request_strategy() -> impl Strategy<Value = WriteRequest> {
    (
        prop::option::of(operation_params_strategy()),
        tx_id_strategy(),
        table_path_strategy(),
        dedup_id_strategy(),
        prop::option::of(data_strategy()),
    )
        .prop_map(|(operation_params, tx_id, path, dedup_id, data)| WriteRequest {
            operation_params,
            tx_id,
            path,
            dedup_id,
            data,
        })
}

/// Strategy for generating read requests, with or without an SQL query.
pub fn read_request_strategy() -> impl Strategy<Value = ReadRequest> {
    (
        tx_id_strategy(),
        table_path_strategy(),
        prop::option::of("[A-Z ]{1,24}"),
    )
        .prop_map(|(tx_id, path, sql)| ReadRequest {
            operation_params: None,
            tx_id,
            path,
            query: sql.map(read_request::Query::Sql),
        })
}

/// Strategy for generating read results.
pub fn read_result_strategy() -> impl Strategy<Value = ReadResult> {
    (
        tx_id_strategy(),
        table_path_strategy(),
        any::<u64>(),
        any::<bool>(),
        prop::option::of(data_strategy()),
    )
        .prop_map(|(tx_id, path, chunk, finished, data)| ReadResult {
            tx_id,
            path,
            chunk,
            finished,
            data,
        })
}

/// Strategy for generating failure statuses.
pub fn failure_status_strategy() -> impl Strategy<Value = StatusCode> {
    prop_oneof![
        Just(StatusCode::BadRequest),
        Just(StatusCode::NotFound),
        Just(StatusCode::PreconditionFailed),
        Just(StatusCode::SchemeError),
        Just(StatusCode::Unsupported),
        Just(StatusCode::Overloaded),
        Just(StatusCode::InternalError),
    ]
}

/// Strategy for generating issue lists.
pub fn issues_strategy() -> impl Strategy<Value = Vec<IssueMessage>> {
    prop::collection::vec("[a-z ]{1,32}".prop_map(IssueMessage::error), 0..3)
}

/// A write step in a generated scenario.
#[derive(Debug, Clone)]
pub struct WriteStep {
    /// Dedup id, possibly empty.
    pub dedup_id: String,
    /// Payload of the block.
    pub payload: Vec<u8>,
}

/// Strategy for generating a sequence of writes where dedup ids repeat.
///
/// Ids are drawn from a small pool so retries are common; a repeated id
/// always carries the payload it was first generated with.
pub fn write_steps_strategy() -> impl Strategy<Value = Vec<WriteStep>> {
    (
        prop::collection::vec(payload_strategy(), 1..4),
        prop::collection::vec((0usize..6, any::<bool>()), 1..16),
    )
        .prop_map(|(payloads, picks)| {
            picks
                .into_iter()
                .map(|(pick, dedup)| {
                    let slot = pick % payloads.len();
                    WriteStep {
                        dedup_id: if dedup { format!("d{slot}") } else { String::new() },
                        payload: payloads[slot].clone(),
                    }
                })
                .collect()
        })
}
