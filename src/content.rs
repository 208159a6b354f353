//! Rewindable content handed to `save`.
//!
//! Uploads are checksummed from the start of the stream and re-read on
//! every retried attempt, so save content must support rewinding. That is
//! a precondition of the contract, not something the adapter can simulate
//! for one-shot inputs.

use std::io::SeekFrom;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::error::StorageError;

/// A byte source that can be reset to its start and drained again.
#[async_trait]
pub trait ContentSource: Send {
    /// Explicit MIME type carried by the stream itself, if any.
    fn content_type(&self) -> Option<&str> {
        None
    }

    /// Reset the read position to the start.
    async fn rewind(&mut self) -> Result<(), StorageError>;

    /// Drain the source from its current position.
    async fn read_all(&mut self) -> Result<Bytes, StorageError>;
}

#[async_trait]
impl<R> ContentSource for R
where
    R: AsyncRead + AsyncSeek + Send + Unpin,
{
    async fn rewind(&mut self) -> Result<(), StorageError> {
        self.seek(SeekFrom::Start(0)).await?;
        Ok(())
    }

    async fn read_all(&mut self) -> Result<Bytes, StorageError> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// Save content: a boxed source plus an optional wrapper-level MIME type.
///
/// The type attached to the stream itself wins over the wrapper-level one;
/// when neither is present the client falls back to guessing from the
/// object name's extension.
pub struct Content {
    source: Box<dyn ContentSource>,
    content_type: Option<String>,
}

impl Content {
    pub fn new(source: impl ContentSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            content_type: None,
        }
    }

    /// In-memory content, rewindable by construction.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::new(std::io::Cursor::new(data.into()))
    }

    /// Attach a wrapper-level MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[async_trait]
impl ContentSource for Content {
    fn content_type(&self) -> Option<&str> {
        self.source.content_type().or(self.content_type.as_deref())
    }

    async fn rewind(&mut self) -> Result<(), StorageError> {
        self.source.rewind().await
    }

    async fn read_all(&mut self) -> Result<Bytes, StorageError> {
        self.source.read_all().await
    }
}
