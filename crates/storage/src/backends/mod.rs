//! Part store backends.

pub mod filesystem;
pub mod memory;

use crate::error::{StorageError, StorageResult};

/// Chunk size for streaming reads (64 KiB).
pub(crate) const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Reject blob paths that are empty or could escape a backend's namespace.
pub(crate) fn validate_path(path: &str) -> StorageResult<()> {
    if path.is_empty() {
        return Err(StorageError::InvalidPath("path is empty".to_string()));
    }
    if path.contains("..") || path.starts_with('/') || path.starts_with('\\') {
        return Err(StorageError::InvalidPath(format!(
            "path traversal not allowed: {path}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_path_rejects_traversal() {
        assert!(validate_path("file.bin").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("../escape").is_err());
        assert!(validate_path("/absolute").is_err());
        assert!(validate_path("\\absolute").is_err());
    }
}
