//! Data blocks carried by writes and reads.

use crate::codec::impl_wire_name;
use bytes::Bytes;

/// A block of table data tagged with its encoding.
///
/// Data blocks are opaque to the protocol: the payload is never inspected,
/// only its format tag. A block has no identity of its own beyond its
/// position in a write or read stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Data {
    /// Payload format, see [`Format`].
    #[prost(enumeration = "Format", tag = "1")]
    pub format: i32,
    /// Encoded payload.
    #[prost(bytes = "bytes", tag = "2")]
    pub data: Bytes,
}

/// Encoding of a [`Data`] payload.
///
/// Value 2 is intentionally unassigned; `ApacheArrow` is 3 on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Format {
    /// No format given.
    FormatUnspecified = 0,
    /// Row-encoded YDB value batch.
    YdbRows = 1,
    /// Apache Arrow record batch.
    ApacheArrow = 3,
}

impl Format {
    /// Returns the protobuf enum value name.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Format::FormatUnspecified => "FORMAT_UNSPECIFIED",
            Format::YdbRows => "YDB_ROWS",
            Format::ApacheArrow => "APACHE_ARROW",
        }
    }
}

impl Data {
    /// Creates a data block with the given format.
    pub fn with_format(format: Format, data: impl Into<Bytes>) -> Self {
        Self {
            format: format as i32,
            data: data.into(),
        }
    }

    /// Creates a row-encoded data block.
    pub fn rows(data: impl Into<Bytes>) -> Self {
        Self::with_format(Format::YdbRows, data)
    }

    /// Creates an Apache Arrow data block.
    pub fn arrow(data: impl Into<Bytes>) -> Self {
        Self::with_format(Format::ApacheArrow, data)
    }

    /// Returns the format, or `None` if the wire value is not a known format.
    pub fn format_kind(&self) -> Option<Format> {
        Format::try_from(self.format).ok()
    }

    /// Returns the payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl_wire_name!(Data => "Ydb.LongTx.Data");

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;
    use proptest::prelude::*;

    #[test]
    fn apache_arrow_is_three() {
        assert_eq!(Format::ApacheArrow as i32, 3);
        assert_eq!(Format::YdbRows as i32, 1);
        assert!(Format::try_from(2).is_err());
    }

    #[test]
    fn unknown_format_survives_decoding() {
        let block = Data {
            format: 2,
            data: Bytes::from_static(b"x"),
        };
        let decoded = Data::decode(block.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.format, 2);
        assert_eq!(decoded.format_kind(), None);
        assert_eq!(decoded.format(), Format::FormatUnspecified);
    }

    #[test]
    fn default_block_encodes_to_nothing() {
        let block = Data::default();
        assert!(block.encode_to_vec().is_empty());
        assert_eq!(block.format_kind(), Some(Format::FormatUnspecified));
    }

    #[test]
    fn arrow_block_wire_bytes() {
        let block = Data::arrow(vec![0xAB]);
        // field 1 varint 3, field 2 length 1
        assert_eq!(block.encode_to_vec(), vec![0x08, 0x03, 0x12, 0x01, 0xAB]);
    }

    proptest! {
        #[test]
        fn format_kind_only_for_assigned_values(value in any::<i32>()) {
            let block = Data { format: value, data: Bytes::new() };
            prop_assert_eq!(block.format_kind().is_some(), matches!(value, 0 | 1 | 3));
        }
    }
}
