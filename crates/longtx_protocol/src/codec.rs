//! Protobuf encoding helpers.

use crate::error::{ProtocolError, ProtocolResult};
use prost::Message;
use prost_types::Any;

/// Prefix used when packing messages into `google.protobuf.Any`.
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// A message with a fully-qualified protobuf name.
pub trait WireName {
    /// Fully-qualified protobuf name, e.g. `Ydb.LongTx.WriteResult`.
    const FULL_NAME: &'static str;

    /// Returns the type URL used when packing this message into an `Any`.
    fn type_url() -> String {
        format!("{TYPE_URL_PREFIX}{}", Self::FULL_NAME)
    }
}

macro_rules! impl_wire_name {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl $crate::codec::WireName for $ty {
                const FULL_NAME: &'static str = $name;
            }
        )*
    };
}

pub(crate) use impl_wire_name;

/// Encodes a message to protobuf bytes.
pub fn encode<M: Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}

/// Decodes a message from protobuf bytes.
pub fn decode<M: Message + Default>(bytes: &[u8]) -> ProtocolResult<M> {
    Ok(M::decode(bytes)?)
}

/// Packs a message into a `google.protobuf.Any`.
pub fn pack_any<M: Message + WireName>(message: &M) -> Any {
    Any {
        type_url: M::type_url(),
        value: message.encode_to_vec(),
    }
}

/// Unpacks a message from a `google.protobuf.Any`.
///
/// Only the part of the type URL after the last `/` is compared, so any
/// resolver host prefix is accepted.
pub fn unpack_any<M: Message + Default + WireName>(any: &Any) -> ProtocolResult<M> {
    let actual = any
        .type_url
        .rsplit_once('/')
        .map_or(any.type_url.as_str(), |(_, name)| name);
    if actual != M::FULL_NAME {
        return Err(ProtocolError::type_mismatch(M::FULL_NAME, actual));
    }
    decode(&any.value)
}
