//! Local filesystem part store.

use crate::backends::{STREAM_CHUNK_SIZE, validate_path};
use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, PartStore, StreamingUpload};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

/// Filesystem-backed blob store rooted at one directory per backend host.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root directory if
    /// needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve a blob path under the root, rejecting traversal attempts.
    fn blob_path(&self, path: &str) -> StorageResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }

    /// Temp-file path used while a write is in flight. A UUID suffix keeps
    /// concurrent writers to the same blob from clobbering each other.
    fn temp_path(&self, final_path: &Path) -> PathBuf {
        let name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        final_path.with_file_name(format!("{name}.tmp.{}", Uuid::new_v4()))
    }

    fn map_not_found(err: std::io::Error, path: &str) -> StorageError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Io(err)
        }
    }
}

#[async_trait]
impl PartStore for FilesystemBackend {
    async fn put(&self, path: &str, data: Bytes) -> StorageResult<()> {
        let mut upload = self.put_stream(path).await?;
        upload.write(data).await?;
        upload.finish().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn put_stream(&self, path: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        let final_path = self.blob_path(path)?;
        let temp_path = self.temp_path(&final_path);
        let file = fs::File::create(&temp_path).await?;

        Ok(Box::new(FilesystemUpload {
            file,
            temp_path,
            final_path,
            bytes_written: 0,
        }))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_stream(&self, path: &str) -> StorageResult<ByteStream> {
        let blob_path = self.blob_path(path)?;
        let file = fs::File::open(&blob_path)
            .await
            .map_err(|e| Self::map_not_found(e, path))?;

        let stream = ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE).map_err(StorageError::Io);
        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, path: &str) -> StorageResult<()> {
        let blob_path = self.blob_path(path)?;
        fs::remove_file(&blob_path)
            .await
            .map_err(|e| Self::map_not_found(e, path))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await?;
        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {}",
                self.root.display()
            )));
        }
        Ok(())
    }
}

struct FilesystemUpload {
    file: fs::File,
    temp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

#[async_trait]
impl StreamingUpload for FilesystemUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.file.write_all(&data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> StorageResult<u64> {
        // All data must be on disk before the rename makes it visible.
        self.file.sync_all().await?;
        drop(self.file);
        fs::rename(&self.temp_path, &self.final_path).await?;
        Ok(self.bytes_written)
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        drop(self.file);
        let _ = fs::remove_file(&self.temp_path).await;
        Ok(())
    }
}
