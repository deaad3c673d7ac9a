//! The file service: partition, place, persist, stream.

use crate::balancer::Balancer;
use crate::error::{ServiceError, ServiceResult};
use crate::reader::MultiPartReader;
use bytes::Bytes;
use futures::StreamExt;
use granary_core::config::ServiceConfig;
use granary_core::file::validate_file_name;
use granary_core::{FileMeta, FilePart, part_sizes};
use granary_metadata::FileMetaStore;
use granary_storage::{ByteStream, StorageHolder, StreamingUpload};
use std::sync::Arc;

/// An inbound file: a name, an exact declared length, and a read-once body.
pub struct FileUpload {
    /// Unique file name.
    pub name: String,
    /// Exact body length in bytes.
    pub content_length: u64,
    /// The file's bytes, consumed once during upload.
    pub body: ByteStream,
}

/// An outbound file: committed metadata plus a read-once body stream.
pub struct FileDownload {
    /// Committed file metadata.
    pub meta: FileMeta,
    /// Lazy multi-part body stream.
    pub body: ByteStream,
}

/// Orchestrates uploads and downloads across the balancer, the per-host
/// part stores, and the metadata store.
///
/// Uploads run the crash-aware two-phase protocol: metadata is persisted in
/// processing state before any bytes move, parts stream to their hosts
/// strictly one at a time, and the record is promoted to committed only
/// after every part is durably stored. No retries and no compensation
/// happen here: a failed upload leaves the processing record and any
/// already-written parts in place for external cleanup.
pub struct FileService {
    balancer: Arc<dyn Balancer>,
    storages: Arc<StorageHolder>,
    metadata: Arc<dyn FileMetaStore>,
    min_chunk_size: u64,
    split_count: u32,
}

impl FileService {
    /// Create a file service.
    pub fn new(
        balancer: Arc<dyn Balancer>,
        storages: Arc<StorageHolder>,
        metadata: Arc<dyn FileMetaStore>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            balancer,
            storages,
            metadata,
            min_chunk_size: config.min_chunk_size,
            split_count: config.split_count,
        }
    }

    /// Upload a file: partition, place, persist as processing, stream every
    /// part to its host in order, then commit.
    pub async fn put_file(&self, file: FileUpload) -> ServiceResult<()> {
        validate_file_name(&file.name)?;

        let sizes = part_sizes(file.content_length, self.split_count, self.min_chunk_size)?;
        let hosts = self.balancer.get_hosts(sizes.len()).await.map_err(|e| {
            tracing::error!(file = %file.name, error = %e, "can't get hosts from balancer");
            e
        })?;

        let meta = FileMeta::new(&file.name, file.content_length).with_parts(hosts, &sizes);

        self.metadata.put_processing(&meta).await.map_err(|e| {
            tracing::error!(file = %meta.name, error = %e, "can't put processing file meta");
            ServiceError::from(e)
        })?;

        let mut source = BodySource::new(file.body, file.content_length);
        for part in &meta.parts {
            if let Err(e) = self.upload_part(part, &mut source).await {
                tracing::error!(
                    file = %meta.name,
                    host = %part.host,
                    error = %e,
                    "can't upload file part"
                );
                return Err(e);
            }
        }

        self.metadata.complete(&meta.name).await.map_err(|e| {
            tracing::error!(file = %meta.name, error = %e, "can't complete file meta");
            ServiceError::from(e)
        })?;

        tracing::info!(
            file = %meta.name,
            parts = meta.parts.len(),
            content_length = meta.content_length,
            "file upload committed"
        );
        Ok(())
    }

    /// Download a file: fetch committed metadata and return a lazy stream
    /// that reassembles the parts in order.
    pub async fn get_file(&self, name: &str) -> ServiceResult<FileDownload> {
        validate_file_name(name)?;
        tracing::info!(file = %name, "start get file request");

        let meta = self.metadata.get(name).await.map_err(|e| {
            tracing::error!(file = %name, error = %e, "can't get file meta");
            ServiceError::from(e)
        })?;

        let body: ByteStream = Box::pin(MultiPartReader::new(
            meta.clone(),
            Arc::clone(&self.storages),
        ));
        Ok(FileDownload { meta, body })
    }

    /// Stream exactly one part's bytes to its host.
    ///
    /// The upload handle is finished on success and aborted on every error
    /// path, so at most one part-upload stream is ever open.
    async fn upload_part(&self, part: &FilePart, source: &mut BodySource) -> ServiceResult<()> {
        let store = self.storages.get(&part.host)?;
        let mut upload = store.put_stream(&part.path).await?;

        match Self::feed_part(upload.as_mut(), part.content_length, source).await {
            Ok(()) => {
                let written = upload.finish().await?;
                if written != part.content_length {
                    return Err(ServiceError::Internal(format!(
                        "part upload wrote {written} bytes, expected {}",
                        part.content_length
                    )));
                }
                Ok(())
            }
            Err(e) => {
                let _ = upload.abort().await;
                Err(e)
            }
        }
    }

    async fn feed_part(
        upload: &mut dyn StreamingUpload,
        part_length: u64,
        source: &mut BodySource,
    ) -> ServiceResult<()> {
        let mut remaining = part_length;
        while remaining > 0 {
            let chunk = source.next_slice(remaining).await?;
            remaining -= chunk.len() as u64;
            upload.write(chunk).await?;
        }
        Ok(())
    }
}

/// Length-bounded view over the request body.
///
/// Hands out slices capped at the caller's limit, carrying the unconsumed
/// remainder of a chunk over to the next part. Bytes beyond the declared
/// length are never pulled from the underlying stream.
struct BodySource {
    body: ByteStream,
    leftover: Bytes,
    consumed: u64,
    declared: u64,
}

impl BodySource {
    fn new(body: ByteStream, declared: u64) -> Self {
        Self {
            body,
            leftover: Bytes::new(),
            consumed: 0,
            declared,
        }
    }

    /// Take the next non-empty slice of at most `max` bytes.
    ///
    /// A body that ends before the declared length is an error: committing
    /// short parts would corrupt the file silently.
    async fn next_slice(&mut self, max: u64) -> ServiceResult<Bytes> {
        while self.leftover.is_empty() {
            match self.body.next().await {
                Some(Ok(chunk)) => self.leftover = chunk,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    return Err(ServiceError::BodyLength {
                        expected: self.declared,
                        received: self.consumed,
                    });
                }
            }
        }

        let take = (self.leftover.len() as u64).min(max) as usize;
        let slice = self.leftover.split_to(take);
        self.consumed += slice.len() as u64;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use granary_storage::StorageResult;

    fn body_from(chunks: Vec<&'static [u8]>) -> ByteStream {
        let items: Vec<StorageResult<Bytes>> = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn body_source_slices_across_chunk_boundaries() {
        let mut source = BodySource::new(body_from(vec![b"abcd", b"efgh"]), 8);

        // Ask for 3-byte slices: chunks are split and carried over.
        let mut out = Vec::new();
        for _ in 0..3 {
            let mut got = 0u64;
            while got < 3 {
                let slice = source.next_slice(3 - got).await;
                match slice {
                    Ok(s) => {
                        got += s.len() as u64;
                        out.extend_from_slice(&s);
                    }
                    Err(ServiceError::BodyLength { .. }) => return assert_eq!(out, b"abcdefgh"),
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }
        unreachable!("body has only 8 bytes");
    }

    #[tokio::test]
    async fn body_source_reports_short_body() {
        let mut source = BodySource::new(body_from(vec![b"abc"]), 10);

        let first = source.next_slice(10).await.unwrap();
        assert_eq!(&first[..], b"abc");

        match source.next_slice(7).await {
            Err(ServiceError::BodyLength { expected, received }) => {
                assert_eq!(expected, 10);
                assert_eq!(received, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_source_skips_empty_chunks() {
        let mut source = BodySource::new(body_from(vec![b"", b"xy", b""]), 2);
        let slice = source.next_slice(2).await.unwrap();
        assert_eq!(&slice[..], b"xy");
    }
}
