//! Lazy sequential reader across a file's parts.

use bytes::Bytes;
use futures::Stream;
use futures::future::BoxFuture;
use granary_core::FileMeta;
use granary_storage::{ByteStream, StorageHolder, StorageResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

enum ReaderState {
    /// No part stream is open; `next_part` is the next part to open.
    Idle { next_part: usize },
    /// Waiting for part `part`'s backend stream to open.
    Opening {
        part: usize,
        open: BoxFuture<'static, StorageResult<ByteStream>>,
    },
    /// Serving bytes from part `part`'s open stream.
    Reading { part: usize, body: ByteStream },
    /// All parts served, or a prior error poisoned the reader.
    Done,
}

/// A single contiguous byte stream reconstructing a file from its parts, in
/// part order, with at most one backend stream open at any instant.
///
/// Parts are opened lazily: nothing touches a backend until the first poll.
/// Reaching a part's end closes its stream and opens the next; any open or
/// read error surfaces immediately and ends the stream. Dropping the reader
/// drops only the currently open part stream — parts not yet opened need no
/// cleanup, and finished parts are already released.
pub struct MultiPartReader {
    meta: FileMeta,
    storages: Arc<StorageHolder>,
    state: ReaderState,
}

impl MultiPartReader {
    /// Create a reader over `meta`'s parts.
    pub fn new(meta: FileMeta, storages: Arc<StorageHolder>) -> Self {
        Self {
            meta,
            storages,
            state: ReaderState::Idle { next_part: 0 },
        }
    }
}

impl Stream for MultiPartReader {
    type Item = StorageResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                ReaderState::Idle { next_part } => {
                    let part_index = *next_part;
                    if part_index >= this.meta.parts.len() {
                        this.state = ReaderState::Done;
                        return Poll::Ready(None);
                    }

                    let part = &this.meta.parts[part_index];
                    let store = match this.storages.get(&part.host) {
                        Ok(store) => store,
                        Err(err) => {
                            this.state = ReaderState::Done;
                            return Poll::Ready(Some(Err(err)));
                        }
                    };
                    let path = part.path.clone();
                    this.state = ReaderState::Opening {
                        part: part_index,
                        open: Box::pin(async move { store.get_stream(&path).await }),
                    };
                }
                ReaderState::Opening { part, open } => match open.as_mut().poll(cx) {
                    Poll::Ready(Ok(body)) => {
                        this.state = ReaderState::Reading { part: *part, body };
                    }
                    Poll::Ready(Err(err)) => {
                        this.state = ReaderState::Done;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Pending => return Poll::Pending,
                },
                ReaderState::Reading { part, body } => match body.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(chunk))) => return Poll::Ready(Some(Ok(chunk))),
                    Poll::Ready(Some(Err(err))) => {
                        this.state = ReaderState::Done;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Ready(None) => {
                        // End of this part: replacing the state drops (and
                        // thereby closes) the finished stream.
                        this.state = ReaderState::Idle {
                            next_part: *part + 1,
                        };
                    }
                    Poll::Pending => return Poll::Pending,
                },
                ReaderState::Done => return Poll::Ready(None),
            }
        }
    }
}
