//! File and part metadata types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One physically stored chunk of a file.
///
/// The part lives on a single backend host under `path`, which is the owning
/// file's name. The balancer hands out distinct hosts for one file's parts,
/// so a host never holds two parts of the same file under the same path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePart {
    /// Identifier of the backend host storing this part.
    pub host: String,
    /// Blob path on that host (the owning file's name).
    pub path: String,
    /// Part length in bytes.
    pub content_length: u64,
}

/// Metadata for one stored file: its name, total length, and the ordered
/// list of parts it was split into.
///
/// Part order is upload order, and exactly the order parts must be
/// concatenated to reconstruct the file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Unique file name.
    pub name: String,
    /// Parts in reassembly order.
    pub parts: Vec<FilePart>,
    /// Total file length in bytes.
    pub content_length: u64,
}

impl FileMeta {
    /// Create metadata for a file that has not been partitioned yet.
    pub fn new(name: impl Into<String>, content_length: u64) -> Self {
        Self {
            name: name.into(),
            parts: Vec::new(),
            content_length,
        }
    }

    /// Attach parts by pairing hosts with part sizes, in order.
    pub fn with_parts(mut self, hosts: Vec<String>, sizes: &[u64]) -> Self {
        self.parts = hosts
            .into_iter()
            .zip(sizes.iter().copied())
            .map(|(host, content_length)| FilePart {
                host,
                path: self.name.clone(),
                content_length,
            })
            .collect();
        self
    }

    /// Sum of all part lengths.
    pub fn parts_length(&self) -> u64 {
        self.parts.iter().map(|p| p.content_length).sum()
    }

    /// Check the sum-of-parts invariant.
    pub fn validate(&self) -> Result<()> {
        validate_file_name(&self.name)?;
        let actual = self.parts_length();
        if actual != self.content_length {
            return Err(Error::PartLengthMismatch {
                expected: self.content_length,
                actual,
            });
        }
        Ok(())
    }
}

/// Validate a file name for use as a per-host blob path.
///
/// Names travel verbatim to every backend as the part path, so path
/// separators and traversal sequences are rejected here, before any work.
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidFileName("name is empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(Error::InvalidFileName(format!(
            "name must not contain path separators or '..': {name}"
        )));
    }
    Ok(())
}
