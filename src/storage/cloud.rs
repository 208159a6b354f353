//! The cloud file-storage adapter.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use tokio::sync::RwLock;

use crate::config::StorageConfig;
use crate::content::{Content, ContentSource};
use crate::error::StorageError;
use crate::headers::HeaderRules;
use crate::protocol::{ContainerHandle, ObjectMetadata, ObjectStore};
use crate::retry::Retry;
use crate::utils;

use super::stream::RemoteFile;
use super::FileStorage;

/// Lazily resolved container state. Each field is resolved at most once;
/// the public URI is dropped whenever the handle is replaced.
#[derive(Debug, Default)]
struct ContainerCache {
    handle: Option<ContainerHandle>,
    public_uri: Option<String>,
}

/// File-storage adapter over a remote object store.
///
/// Clones are cheap and share the resolved container and public-URI
/// caches. Resolution is idempotent, so two clones racing on the first
/// access settle on one handle for the same remote container.
#[derive(Clone)]
pub struct CloudStorage {
    config: Arc<StorageConfig>,
    store: Arc<dyn ObjectStore>,
    header_rules: Arc<HeaderRules>,
    retry: Retry,
    container: Arc<RwLock<ContainerCache>>,
}

impl std::fmt::Debug for CloudStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudStorage")
            .field("config", &self.config)
            .field("store", &"<dyn ObjectStore>")
            .field("header_rules", &self.header_rules)
            .field("retry", &self.retry)
            .field("container", &self.container)
            .finish()
    }
}

impl CloudStorage {
    /// Validate the configuration and perform the credential handshake.
    /// Authentication failures surface immediately and are never retried.
    pub async fn new(
        config: StorageConfig,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, StorageError> {
        config.validate()?;
        store.authenticate(&config).await?;
        tracing::info!("authenticated against object store as {}", config.username);

        let header_rules = HeaderRules::new(&config.headers)?;
        let cache = ContainerCache {
            handle: None,
            // An explicitly configured public URI short-circuits the CDN
            // lookup until the container is replaced.
            public_uri: config.container_uri.clone(),
        };
        Ok(Self {
            retry: Retry::new(config.max_retries),
            header_rules: Arc::new(header_rules),
            container: Arc::new(RwLock::new(cache)),
            store,
            config: Arc::new(config),
        })
    }

    /// Same adapter pointed at the static-assets container.
    pub async fn for_static_assets(
        mut config: StorageConfig,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, StorageError> {
        let static_container = config.static_container.clone().ok_or_else(|| {
            StorageError::Configuration("static_container is not configured".into())
        })?;
        config.container = static_container;
        Self::new(config, store).await
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Resolve the container handle on first use; later calls reuse the
    /// cached handle for the lifetime of the adapter unless it is replaced
    /// through `set_container`.
    pub async fn container(&self) -> Result<ContainerHandle, StorageError> {
        {
            let cache = self.container.read().await;
            if let Some(handle) = &cache.handle {
                return Ok(handle.clone());
            }
        }
        let resolved = self
            .retry
            .run("resolve container", || {
                self.store.find_container(&self.config.container)
            })
            .await?;
        tracing::info!("resolved container {}", resolved.name);
        let mut cache = self.container.write().await;
        // A concurrent resolution may have won the race; both handles
        // refer to the same remote container, keep the first.
        let handle = cache.handle.get_or_insert(resolved);
        Ok(handle.clone())
    }

    /// Replace the cached container handle. The new container is made
    /// publicly readable with the configured TTL and the cached public
    /// URI is discarded so it is recomputed from the new CDN endpoints.
    pub async fn set_container(&self, handle: ContainerHandle) -> Result<(), StorageError> {
        self.store
            .make_container_public(&handle, self.config.ttl_secs)
            .await?;
        let mut cache = self.container.write().await;
        cache.public_uri = None;
        cache.handle = Some(handle);
        Ok(())
    }

    /// Public base URL for the container, SSL or plain per configuration.
    /// Computed once and cached until the container handle is replaced.
    pub async fn container_url(&self) -> Result<String, StorageError> {
        {
            let cache = self.container.read().await;
            if let Some(uri) = &cache.public_uri {
                return Ok(uri.clone());
            }
        }
        let container = self.container().await?;
        let resolved = if self.config.use_ssl {
            container.cdn_ssl_uri
        } else {
            container.cdn_uri
        };
        let mut cache = self.container.write().await;
        let uri = cache.public_uri.get_or_insert(resolved);
        Ok(uri.clone())
    }

    /// Retry-wrapped metadata fetch. Not-found propagates untranslated;
    /// each public operation applies its own translation.
    pub(crate) async fn object_metadata(&self, name: &str) -> Result<ObjectMetadata, StorageError> {
        let container = self.container().await?;
        self.retry
            .run(&format!("fetch {}", name), || {
                self.store.object_metadata(&container, name)
            })
            .await
    }

    pub(crate) async fn fetch_object(&self, name: &str) -> Result<Bytes, StorageError> {
        let container = self.container().await?;
        self.store.fetch_object(&container, name).await
    }

    pub(crate) async fn fetch_chunk(
        &self,
        name: &str,
        offset: u64,
        max_len: usize,
    ) -> Result<Bytes, StorageError> {
        let container = self.container().await?;
        self.store
            .fetch_chunk(&container, name, offset, max_len)
            .await
    }
}

#[async_trait]
impl FileStorage for CloudStorage {
    async fn open(&self, name: &str) -> Result<RemoteFile, StorageError> {
        Ok(RemoteFile::new(self.clone(), name))
    }

    async fn save(&self, name: &str, content: &mut Content) -> Result<String, StorageError> {
        // The checksum is always computed from the start of the stream.
        content.rewind().await?;
        let checksum = format!("{:x}", md5::compute(content.read_all().await?));

        let existing = match self.object_metadata(name).await {
            Ok(meta) => Some(meta),
            Err(StorageError::NotFound(_)) => None,
            Err(err) => return Err(err),
        };
        // A matching checksum means the remote copy is already current.
        if let Some(meta) = &existing {
            if meta.etag.as_deref() == Some(checksum.as_str()) {
                tracing::debug!("{} unchanged, skipping upload", name);
                return Ok(name.to_string());
            }
        }

        let content_type = content
            .content_type()
            .map(str::to_string)
            .or_else(|| mime_guess::from_path(name).first_raw().map(str::to_string));
        let extra_headers = self.header_rules.headers_for(name);

        let container = self.container().await?;
        content.rewind().await?;
        self.retry
            .run_with_rewind(&format!("upload {}", name), content, |data| {
                self.store.upload_object(
                    &container,
                    name,
                    data,
                    content_type.as_deref(),
                    &checksum,
                    &extra_headers,
                )
            })
            .await?;
        Ok(name.to_string())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let container = self.container().await?;
        match self
            .retry
            .run(&format!("delete {}", name), || {
                self.store.delete_object(&container, name)
            })
            .await
        {
            // Already gone is success.
            Err(StorageError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        match self.object_metadata(name).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn list(&self, prefix: &str) -> Result<(Vec<String>, Vec<String>), StorageError> {
        let prefix = utils::normalize_prefix(prefix);
        let container = self.container().await?;
        let names = self
            .retry
            .run("list objects", || {
                self.store.list_objects(&container, &prefix)
            })
            .await?;
        // Flat namespace: there are no real directories to report.
        Ok((Vec::new(), names))
    }

    async fn size(&self, name: &str) -> Result<u64, StorageError> {
        Ok(self.object_metadata(name).await?.bytes)
    }

    fn get_valid_name(&self, name: &str) -> String {
        utils::get_valid_filename(name)
    }

    async fn url(&self, name: &str) -> Result<String, StorageError> {
        Ok(format!("{}/{}", self.container_url().await?, name))
    }

    async fn modified_time(&self, name: &str) -> Result<NaiveDateTime, StorageError> {
        let meta = self.object_metadata(name).await?;
        let parsed = parse_last_modified(&meta.last_modified)?;
        // Local wall-clock time with the zone marker stripped, matching
        // the filesystem-backed storages this gets compared against.
        Ok(parsed.with_timezone(&Local).naive_local())
    }
}

/// Remote stores report last-modified in a handful of formats; zone-less
/// strings are read as UTC.
fn parse_last_modified(raw: &str) -> Result<DateTime<FixedOffset>, StorageError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Ok(parsed);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    Err(StorageError::Unsupported(format!(
        "unrecognized last-modified timestamp: {:?}",
        raw
    )))
}
