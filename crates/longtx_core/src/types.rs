//! Core type definitions.

use crate::error::{CoreError, CoreResult};
use longtx_protocol::TxTypeId;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Scheme prefix of every long transaction id.
pub const LONG_TX_ID_PREFIX: &str = "ydb://long-tx/";

/// Opaque identifier of a long transaction.
///
/// Ids are random v4 UUIDs rendered as `ydb://long-tx/<32 hex chars>`.
/// The registry never reissues an id it has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LongTxId(Uuid);

impl LongTxId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an id from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parses the wire form of an id.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidTxId {
            value: value.to_string(),
        };
        let body = value.strip_prefix(LONG_TX_ID_PREFIX).ok_or_else(invalid)?;
        if body.len() != 32 {
            return Err(invalid());
        }
        Uuid::try_parse(body).map(Self).map_err(|_| invalid())
    }
}

impl fmt::Display for LongTxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LONG_TX_ID_PREFIX}{}", self.0.simple())
    }
}

impl FromStr for LongTxId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Kind of long transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    /// Appends data to tables; staged writes become visible on commit.
    Write,
    /// Reads a snapshot taken at begin.
    Read,
}

impl TxType {
    /// Converts from the wire enum. `Unspecified` is rejected.
    pub fn from_wire(value: TxTypeId) -> CoreResult<Self> {
        match value {
            TxTypeId::Write => Ok(TxType::Write),
            TxTypeId::Read => Ok(TxType::Read),
            TxTypeId::Unspecified => Err(CoreError::invalid_argument(
                "transaction type is not specified",
            )),
        }
    }

    /// Converts from a raw wire value.
    pub fn from_wire_value(value: i32) -> CoreResult<Self> {
        let wire = TxTypeId::try_from(value).map_err(|_| {
            CoreError::invalid_argument(format!("unknown transaction type: {value}"))
        })?;
        Self::from_wire(wire)
    }

    /// Converts to the wire enum.
    #[must_use]
    pub fn to_wire(self) -> TxTypeId {
        match self {
            TxType::Write => TxTypeId::Write,
            TxType::Read => TxTypeId::Read,
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::Write => f.write_str("write"),
            TxType::Read => f.write_str("read"),
        }
    }
}

/// Lifecycle state of a long transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxState {
    /// Accepting writes and reads.
    Active,
    /// Committed; staged writes were applied.
    Committed,
    /// Rolled back; staged writes were discarded.
    RolledBack,
    /// Reclaimed after staying idle past the timeout.
    Expired,
}

impl TxState {
    /// Returns true for states that end the transaction.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, TxState::Active)
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxState::Active => f.write_str("active"),
            TxState::Committed => f.write_str("committed"),
            TxState::RolledBack => f.write_str("rolled back"),
            TxState::Expired => f.write_str("expired"),
        }
    }
}

/// Version of the table store.
///
/// Every commit that applies data creates a new, higher version. Read
/// transactions observe the version current at their begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnapshotVersion(pub u64);

impl SnapshotVersion {
    /// Creates a snapshot version.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Returns the raw version.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next version.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_display_and_parse() {
        let id = LongTxId::generate();
        let text = id.to_string();
        assert!(text.starts_with(LONG_TX_ID_PREFIX));
        assert_eq!(text.len(), LONG_TX_ID_PREFIX.len() + 32);
        assert_eq!(LongTxId::parse(&text).unwrap(), id);
        assert_eq!(text.parse::<LongTxId>().unwrap(), id);
    }

    #[test]
    fn id_parse_rejects_malformed() {
        for bad in [
            "",
            "ydb://long-tx/",
            "ydb://long-tx/not-a-uuid",
            "long-tx/0123456789abcdef0123456789abcdef",
            "ydb://long-tx/01234567-89ab-cdef-0123-456789abcdef",
        ] {
            assert!(
                matches!(LongTxId::parse(bad), Err(CoreError::InvalidTxId { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn ids_are_unique() {
        let a = LongTxId::generate();
        let b = LongTxId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn tx_type_from_wire() {
        assert_eq!(TxType::from_wire(TxTypeId::Write).unwrap(), TxType::Write);
        assert_eq!(TxType::from_wire_value(2).unwrap(), TxType::Read);
        assert!(TxType::from_wire_value(0).is_err());
        assert!(TxType::from_wire_value(7).is_err());
        assert_eq!(TxType::Read.to_wire(), TxTypeId::Read);
    }

    #[test]
    fn terminal_states() {
        assert!(!TxState::Active.is_terminal());
        assert!(TxState::Committed.is_terminal());
        assert!(TxState::RolledBack.is_terminal());
        assert!(TxState::Expired.is_terminal());
    }

    #[test]
    fn snapshot_version_next() {
        assert_eq!(SnapshotVersion::new(4).next().as_u64(), 5);
        assert_eq!(format!("{}", SnapshotVersion::new(9)), "v9");
    }
}
