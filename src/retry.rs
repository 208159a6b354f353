//! Bounded retry around fallible remote calls.
//!
//! One executor replaces the per-operation retry loops: transient
//! transport failures are logged and retried immediately (no backoff,
//! deliberately) until the configured bound, then the last failure is
//! surfaced wrapped in `RetriesExhausted`. Fatal failures, not-found
//! included, propagate without consuming a retry.

use std::future::Future;

use bytes::Bytes;

use crate::content::ContentSource;
use crate::error::StorageError;

#[derive(Debug, Clone, Copy)]
pub struct Retry {
    max_retries: u32,
}

impl Retry {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `op` until it succeeds, fails fatally, or exhausts the bound.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut attempts = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    if attempts >= self.max_retries {
                        return Err(StorageError::RetriesExhausted {
                            attempts,
                            source: Box::new(err),
                        });
                    }
                    attempts += 1;
                    tracing::warn!(
                        "{} failed: {} (attempt {}/{})",
                        what,
                        err,
                        attempts,
                        self.max_retries
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Like `run`, for operations consuming an input stream: the executor
    /// drains `input` for each attempt and rewinds it to its start before
    /// every retried one.
    pub async fn run_with_rewind<S, T, F, Fut>(
        &self,
        what: &str,
        input: &mut S,
        mut op: F,
    ) -> Result<T, StorageError>
    where
        S: ContentSource + ?Sized,
        F: FnMut(Bytes) -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut attempts = 0u32;
        loop {
            let data = input.read_all().await?;
            match op(data).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    if attempts >= self.max_retries {
                        return Err(StorageError::RetriesExhausted {
                            attempts,
                            source: Box::new(err),
                        });
                    }
                    attempts += 1;
                    tracing::warn!(
                        "{} failed: {} (attempt {}/{})",
                        what,
                        err,
                        attempts,
                        self.max_retries
                    );
                    input.rewind().await?;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
