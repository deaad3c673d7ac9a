//! Part store trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// One backend host's blob store.
///
/// A part store holds named blobs; Granary stores at most one part of a
/// given file per host, under the file's name.
#[async_trait]
pub trait PartStore: Send + Sync + 'static {
    /// Write a whole blob atomically.
    async fn put(&self, path: &str, data: Bytes) -> StorageResult<()>;

    /// Start a streaming upload for a blob.
    ///
    /// The blob becomes visible only when the returned upload is finished;
    /// aborting discards everything written so far.
    async fn put_stream(&self, path: &str) -> StorageResult<Box<dyn StreamingUpload>>;

    /// Read a blob as a byte stream.
    async fn get_stream(&self, path: &str) -> StorageResult<ByteStream>;

    /// Delete a blob.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Static identifier for the backend type, used in logging.
    fn backend_name(&self) -> &'static str;

    /// Verify backend availability.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Trait for streaming uploads.
#[async_trait]
pub trait StreamingUpload: Send {
    /// Write a chunk of data.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Finish the upload and return the total bytes written.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;

    /// Abort the upload, discarding written data.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}
