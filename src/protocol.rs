//! Call contract of the remote object store.
//!
//! The adapter core is written against this trait; the wire protocol
//! behind it (request formats, signatures, endpoints) is the
//! implementation's concern. Implementations receive the full
//! `StorageConfig` at `authenticate` and are expected to honor
//! `timeout_secs`, `use_service_net` and `connection_args` themselves.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::error::StorageError;

/// Opaque reference to a remote container, resolved by name. Carries the
/// CDN endpoints the public base URL is derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub name: String,
    pub cdn_uri: String,
    pub cdn_ssl_uri: String,
}

/// Metadata the remote store reports for one object. Never cached beyond a
/// single call except inside a read handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub name: String,
    /// Content checksum as reported by the store.
    pub etag: Option<String>,
    /// Total size in bytes.
    pub bytes: u64,
    /// Raw last-modified string; zone-less values are read as UTC.
    pub last_modified: String,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Credential handshake with the identity provider. Performed once,
    /// eagerly, at client construction; failures are fatal and never
    /// retried.
    async fn authenticate(&self, config: &StorageConfig) -> Result<(), StorageError>;

    /// Resolve a container by name. `NotFound` when it does not exist.
    async fn find_container(&self, name: &str) -> Result<ContainerHandle, StorageError>;

    /// Mark a container publicly readable with the given cache TTL.
    async fn make_container_public(
        &self,
        container: &ContainerHandle,
        ttl_secs: u64,
    ) -> Result<(), StorageError>;

    /// Names of all objects under `prefix` (the namespace is flat).
    async fn list_objects(
        &self,
        container: &ContainerHandle,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError>;

    async fn object_metadata(
        &self,
        container: &ContainerHandle,
        name: &str,
    ) -> Result<ObjectMetadata, StorageError>;

    /// Entire object body.
    async fn fetch_object(
        &self,
        container: &ContainerHandle,
        name: &str,
    ) -> Result<Bytes, StorageError>;

    /// Up to `max_len` bytes starting at `offset`; an empty result signals
    /// the end of the object.
    async fn fetch_chunk(
        &self,
        container: &ContainerHandle,
        name: &str,
        offset: u64,
        max_len: usize,
    ) -> Result<Bytes, StorageError>;

    /// Store `data` under `name` with the given content type, checksum and
    /// extra headers, replacing any existing object.
    #[allow(clippy::too_many_arguments)]
    async fn upload_object(
        &self,
        container: &ContainerHandle,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
        etag: &str,
        extra_headers: &HashMap<String, String>,
    ) -> Result<(), StorageError>;

    /// Delete by name. `NotFound` when the object is already gone; the
    /// caller decides whether that counts as success.
    async fn delete_object(
        &self,
        container: &ContainerHandle,
        name: &str,
    ) -> Result<(), StorageError>;
}
