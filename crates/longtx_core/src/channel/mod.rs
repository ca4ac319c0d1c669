//! Chunked data channel.
//!
//! Writes are staged per table path inside their transaction and deduplicated
//! by client-supplied ids. Reads walk the committed blocks of a path as a
//! sequence of numbered chunks.

mod read;
mod write;

pub use read::{ReadChunk, ReadCursor, ReadSelector};
pub use write::{StagedWrites, WriteOutcome};

use crate::error::{CoreError, CoreResult};

/// Checks that `path` is an absolute table path such as `/Root/db/table`.
pub fn validate_path(path: &str) -> CoreResult<()> {
    if path.is_empty() {
        return Err(CoreError::invalid_argument("path is empty"));
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(CoreError::invalid_argument(format!(
            "path must be absolute: {path}"
        )));
    };
    if rest.is_empty() || rest.split('/').any(str::is_empty) {
        return Err(CoreError::invalid_argument(format!(
            "path has empty segments: {path}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_paths() {
        assert!(validate_path("/Root").is_ok());
        assert!(validate_path("/Root/db/events").is_ok());
    }

    #[test]
    fn rejects_bad_paths() {
        for bad in ["", "/", "Root/t", "/Root//t", "/Root/t/"] {
            assert!(validate_path(bad).is_err(), "accepted {bad:?}");
        }
    }
}
