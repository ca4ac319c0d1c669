//! Read cursors.

use longtx_protocol::Data;

/// What a read selects from a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadSelector {
    /// The whole table at the given path.
    Path,
    /// An SQL query over the table.
    Sql(String),
}

/// One chunk returned by a read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadChunk {
    /// Chunk number, starting from 0.
    pub chunk: u64,
    /// True on the last chunk of the read.
    pub finished: bool,
    /// Chunk payload.
    pub data: Data,
}

/// Position within the committed blocks of one path.
///
/// Each committed block is one chunk; blocks are never split because their
/// payloads are opaque. A table with no blocks yields a single empty,
/// finished chunk.
#[derive(Debug)]
pub struct ReadCursor {
    blocks: Vec<Data>,
    next: usize,
}

impl ReadCursor {
    /// Creates a cursor over `blocks`.
    pub fn new(blocks: Vec<Data>) -> Self {
        Self { blocks, next: 0 }
    }

    /// Returns the number of chunks this cursor yields.
    pub fn chunk_count(&self) -> usize {
        self.blocks.len().max(1)
    }

    /// Returns true once the finished chunk has been returned.
    pub fn is_exhausted(&self) -> bool {
        self.next >= self.chunk_count()
    }

    /// Returns the next chunk, or `None` once exhausted.
    pub fn next_chunk(&mut self) -> Option<ReadChunk> {
        if self.is_exhausted() {
            return None;
        }
        let chunk = self.next;
        self.next += 1;
        let data = self.blocks.get(chunk).cloned().unwrap_or_default();
        Some(ReadChunk {
            chunk: chunk as u64,
            finished: self.is_exhausted(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longtx_protocol::Format;
    use proptest::prelude::*;

    #[test]
    fn empty_table_yields_one_finished_chunk() {
        let mut cursor = ReadCursor::new(Vec::new());
        let chunk = cursor.next_chunk().unwrap();

        assert_eq!(chunk.chunk, 0);
        assert!(chunk.finished);
        assert!(chunk.data.is_empty());
        assert_eq!(chunk.data.format_kind(), Some(Format::FormatUnspecified));
        assert!(cursor.next_chunk().is_none());
    }

    #[test]
    fn chunks_are_numbered_in_order() {
        let mut cursor = ReadCursor::new(vec![
            Data::rows(&b"a"[..]),
            Data::arrow(&b"b"[..]),
            Data::rows(&b"c"[..]),
        ]);

        let mut numbers = Vec::new();
        while let Some(chunk) = cursor.next_chunk() {
            numbers.push((chunk.chunk, chunk.finished));
        }
        assert_eq!(numbers, vec![(0, false), (1, false), (2, true)]);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn chunk_keeps_block_format() {
        let mut cursor = ReadCursor::new(vec![Data::arrow(&b"x"[..])]);
        let chunk = cursor.next_chunk().unwrap();
        assert_eq!(chunk.data.format_kind(), Some(Format::ApacheArrow));
    }

    proptest! {
        #[test]
        fn chunk_numbers_are_dense(sizes in prop::collection::vec(0usize..16, 0..20)) {
            let blocks: Vec<Data> = sizes.iter().map(|n| Data::rows(vec![0u8; *n])).collect();
            let expected = blocks.len().max(1);
            let mut cursor = ReadCursor::new(blocks);

            let mut seen = 0u64;
            while let Some(chunk) = cursor.next_chunk() {
                prop_assert_eq!(chunk.chunk, seen);
                seen += 1;
                prop_assert_eq!(chunk.finished, seen as usize == expected);
            }
            prop_assert_eq!(seen as usize, expected);
        }
    }
}
