//! In-memory part store, the reference backend for testing.

use crate::backends::{STREAM_CHUNK_SIZE, validate_path};
use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, PartStore, StreamingUpload};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory blob store: a path-to-bytes map behind a read/write lock,
/// supporting concurrent readers and exclusive writers.
#[derive(Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Bytes>> {
        // Lock poisoning only happens if a writer panicked; propagating the
        // panic here is the least surprising outcome for a test backend.
        self.objects.read().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl PartStore for MemoryBackend {
    async fn put(&self, path: &str, data: Bytes) -> StorageResult<()> {
        validate_path(path)?;
        let mut map = self.objects.write().expect("memory store lock poisoned");
        map.insert(path.to_string(), data);
        Ok(())
    }

    async fn put_stream(&self, path: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        validate_path(path)?;
        Ok(Box::new(MemoryUpload {
            objects: Arc::clone(&self.objects),
            path: path.to_string(),
            buf: BytesMut::new(),
        }))
    }

    async fn get_stream(&self, path: &str) -> StorageResult<ByteStream> {
        validate_path(path)?;
        let data = self
            .read_map()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;

        // Serve the blob in bounded chunks so readers exercise the same
        // multi-chunk paths they would against a real backend.
        let chunks: Vec<StorageResult<Bytes>> = ChunkIter { data }.map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        validate_path(path)?;
        let mut map = self.objects.write().expect("memory store lock poisoned");
        map.remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct ChunkIter {
    data: Bytes,
}

impl Iterator for ChunkIter {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.data.is_empty() {
            return None;
        }
        let take = self.data.len().min(STREAM_CHUNK_SIZE);
        Some(self.data.split_to(take))
    }
}

struct MemoryUpload {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
    path: String,
    buf: BytesMut,
}

#[async_trait]
impl StreamingUpload for MemoryUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.buf.extend_from_slice(&data);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        let written = self.buf.len() as u64;
        let mut map = self.objects.write().expect("memory store lock poisoned");
        map.insert(self.path, self.buf.freeze());
        Ok(written)
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        Ok(())
    }
}
