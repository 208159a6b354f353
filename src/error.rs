use std::fmt;

use thiserror::Error;

/// Which layer a transient transport failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Network-level I/O failure (connection reset, unreachable host).
    Network,
    /// TLS handshake or record failure.
    Tls,
    /// The remote service answered with a server-side failure.
    Service,
    /// Socket-level failure below the protocol layer.
    Socket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportKind::Network => "network",
            TransportKind::Tls => "tls",
            TransportKind::Service => "service",
            TransportKind::Socket => "socket",
        };
        f.write_str(label)
    }
}

/// Failures surfaced by the storage adapter.
///
/// Only `Transport` is transient: the retry executor swallows it up to the
/// configured bound and then wraps the last occurrence in
/// `RetriesExhausted`. Everything else propagates on first occurrence.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage configuration: {0}")]
    Configuration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{kind} failure: {message}")]
    Transport {
        kind: TransportKind,
        message: String,
    },

    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: Box<StorageError>,
    },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        StorageError::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        StorageError::NotFound(what.into())
    }

    /// True for failures the retry executor is allowed to swallow.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transport { .. })
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Other(anyhow::Error::new(err))
    }
}
