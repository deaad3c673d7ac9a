//! Shared test fixtures: instrumented and fault-injecting part stores.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use granary_storage::{
    ByteStream, MemoryBackend, PartStore, StorageError, StorageResult, StreamingUpload,
};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

#[derive(Clone, Copy)]
enum StreamKind {
    Read,
    Upload,
}

/// Counters shared by every instrumented store in a holder.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[derive(Default)]
#[allow(dead_code)]
pub struct OpenCounts {
    open_reads: AtomicUsize,
    max_open_reads: AtomicUsize,
    open_uploads: AtomicUsize,
    max_open_uploads: AtomicUsize,
}

#[allow(dead_code)]
impl OpenCounts {
    pub fn open_reads(&self) -> usize {
        self.open_reads.load(Ordering::SeqCst)
    }

    pub fn max_open_reads(&self) -> usize {
        self.max_open_reads.load(Ordering::SeqCst)
    }

    pub fn open_uploads(&self) -> usize {
        self.open_uploads.load(Ordering::SeqCst)
    }

    pub fn max_open_uploads(&self) -> usize {
        self.max_open_uploads.load(Ordering::SeqCst)
    }

    fn counters(&self, kind: StreamKind) -> (&AtomicUsize, &AtomicUsize) {
        match kind {
            StreamKind::Read => (&self.open_reads, &self.max_open_reads),
            StreamKind::Upload => (&self.open_uploads, &self.max_open_uploads),
        }
    }

    fn enter(self: &Arc<Self>, kind: StreamKind) -> CountGuard {
        let (open, max) = self.counters(kind);
        let now = open.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        CountGuard {
            counts: Arc::clone(self),
            kind,
        }
    }
}

pub struct CountGuard {
    counts: Arc<OpenCounts>,
    kind: StreamKind,
}

impl Drop for CountGuard {
    fn drop(&mut self) {
        let (open, _) = self.counts.counters(self.kind);
        open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A memory-backed store that tracks how many read streams and upload
/// handles are open at once.
#[allow(dead_code)]
pub struct InstrumentedStore {
    inner: MemoryBackend,
    counts: Arc<OpenCounts>,
}

#[allow(dead_code)]
impl InstrumentedStore {
    pub fn new(counts: Arc<OpenCounts>) -> Self {
        Self {
            inner: MemoryBackend::new(),
            counts,
        }
    }
}

struct TrackedStream {
    inner: ByteStream,
    _guard: CountGuard,
}

impl Stream for TrackedStream {
    type Item = StorageResult<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

struct TrackedUpload {
    inner: Box<dyn StreamingUpload>,
    _guard: CountGuard,
}

#[async_trait]
impl StreamingUpload for TrackedUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.inner.write(data).await
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        self.inner.finish().await
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        self.inner.abort().await
    }
}

#[async_trait]
impl PartStore for InstrumentedStore {
    async fn put(&self, path: &str, data: Bytes) -> StorageResult<()> {
        self.inner.put(path, data).await
    }

    async fn put_stream(&self, path: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        let inner = self.inner.put_stream(path).await?;
        let guard = self.counts.enter(StreamKind::Upload);
        Ok(Box::new(TrackedUpload {
            inner,
            _guard: guard,
        }))
    }

    async fn get_stream(&self, path: &str) -> StorageResult<ByteStream> {
        let inner = self.inner.get_stream(path).await?;
        let guard = self.counts.enter(StreamKind::Read);
        Ok(Box::pin(TrackedStream {
            inner,
            _guard: guard,
        }))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    fn backend_name(&self) -> &'static str {
        "instrumented-memory"
    }
}

/// A store whose operations always fail, for partial-failure scenarios.
#[allow(dead_code)]
pub struct FailingStore;

#[async_trait]
impl PartStore for FailingStore {
    async fn put(&self, _path: &str, _data: Bytes) -> StorageResult<()> {
        Err(injected_failure())
    }

    async fn put_stream(&self, _path: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        Err(injected_failure())
    }

    async fn get_stream(&self, _path: &str) -> StorageResult<ByteStream> {
        Err(injected_failure())
    }

    async fn delete(&self, _path: &str) -> StorageResult<()> {
        Err(injected_failure())
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

fn injected_failure() -> StorageError {
    StorageError::Io(std::io::Error::other("injected backend failure"))
}
