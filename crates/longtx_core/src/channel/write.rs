//! Write staging and deduplication.

use crate::error::{CoreError, CoreResult};
use longtx_protocol::Data;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// What happened to a staged write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The block was staged.
    Applied,
    /// The dedup id was already staged with identical data; nothing changed.
    Duplicate,
}

/// Writes staged for one table path within one transaction.
///
/// Dedup ids are remembered together with a SHA-256 digest of the block, so
/// a retried write is recognised and a reused id with different data is
/// rejected. An empty dedup id disables deduplication for that write.
#[derive(Debug, Default)]
pub struct StagedWrites {
    blocks: Vec<Data>,
    seen: HashMap<String, [u8; 32]>,
}

impl StagedWrites {
    /// Creates an empty staging area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a block under `dedup_id`.
    pub fn stage(&mut self, path: &str, dedup_id: &str, data: Data) -> CoreResult<WriteOutcome> {
        if dedup_id.is_empty() {
            self.blocks.push(data);
            return Ok(WriteOutcome::Applied);
        }

        let digest = digest(&data);
        match self.seen.get(dedup_id) {
            Some(existing) if *existing == digest => Ok(WriteOutcome::Duplicate),
            Some(_) => Err(CoreError::DedupConflict {
                path: path.to_string(),
                dedup_id: dedup_id.to_string(),
            }),
            None => {
                self.seen.insert(dedup_id.to_string(), digest);
                self.blocks.push(data);
                Ok(WriteOutcome::Applied)
            }
        }
    }

    /// Returns the number of staged blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the total staged payload size in bytes.
    pub fn staged_bytes(&self) -> usize {
        self.blocks.iter().map(Data::len).sum()
    }

    /// Consumes the staging area, returning blocks in write order.
    pub fn into_blocks(self) -> Vec<Data> {
        self.blocks
    }
}

fn digest(data: &Data) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data.format.to_le_bytes());
    hasher.update(&data.data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_in_order() {
        let mut staged = StagedWrites::new();
        staged.stage("/t", "a", Data::rows(&b"1"[..])).unwrap();
        staged.stage("/t", "b", Data::rows(&b"22"[..])).unwrap();

        assert_eq!(staged.len(), 2);
        assert_eq!(staged.staged_bytes(), 3);
        let blocks = staged.into_blocks();
        assert_eq!(blocks[0].data.as_ref(), b"1");
        assert_eq!(blocks[1].data.as_ref(), b"22");
    }

    #[test]
    fn retry_is_duplicate() {
        let mut staged = StagedWrites::new();
        let block = Data::arrow(&b"batch"[..]);

        assert_eq!(
            staged.stage("/t", "a", block.clone()).unwrap(),
            WriteOutcome::Applied
        );
        assert_eq!(
            staged.stage("/t", "a", block).unwrap(),
            WriteOutcome::Duplicate
        );
        assert_eq!(staged.len(), 1);
    }

    #[test]
    fn reused_id_with_other_data_conflicts() {
        let mut staged = StagedWrites::new();
        staged.stage("/t", "a", Data::rows(&b"x"[..])).unwrap();

        let err = staged.stage("/t", "a", Data::rows(&b"y"[..])).unwrap_err();
        assert!(matches!(err, CoreError::DedupConflict { .. }));
    }

    #[test]
    fn format_is_part_of_identity() {
        let mut staged = StagedWrites::new();
        staged.stage("/t", "a", Data::rows(&b"x"[..])).unwrap();
        assert!(staged.stage("/t", "a", Data::arrow(&b"x"[..])).is_err());
    }

    #[test]
    fn empty_dedup_id_always_applies() {
        let mut staged = StagedWrites::new();
        let block = Data::rows(&b"x"[..]);
        staged.stage("/t", "", block.clone()).unwrap();
        staged.stage("/t", "", block).unwrap();
        assert_eq!(staged.len(), 2);
    }
}
