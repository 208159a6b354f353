//! Lazy streaming read handle over one remote object.

use bytes::Bytes;
use futures::Stream;

use crate::error::StorageError;
use crate::protocol::ObjectMetadata;

use super::cloud::CloudStorage;

/// Default read granularity for `chunks`.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Read handle for one remote object.
///
/// Nothing is fetched until the size or the content is actually
/// requested; the size and the remote object handle are each resolved at
/// most once. Handles are single-use and single-owner: the cursor only
/// moves forward and never passes the resolved size.
pub struct RemoteFile {
    storage: CloudStorage,
    name: String,
    size: Option<u64>,
    object: Option<ObjectMetadata>,
    pos: u64,
}

impl RemoteFile {
    pub(crate) fn new(storage: CloudStorage, name: &str) -> Self {
        Self {
            storage,
            name: name.to_string(),
            size: None,
            object: None,
            pos: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Object size, fetched on first call and cached.
    pub async fn size(&mut self) -> Result<u64, StorageError> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let size = self.storage.object_metadata(&self.name).await?.bytes;
        self.size = Some(size);
        Ok(size)
    }

    /// Resolve the remote object handle once; the cursor starts at 0.
    /// Later calls reuse the resolved handle.
    pub async fn open(&mut self) -> Result<(), StorageError> {
        if self.object.is_none() {
            let meta = self.storage.object_metadata(&self.name).await?;
            self.object = Some(meta);
            self.pos = 0;
        }
        Ok(())
    }

    /// Metadata of the resolved object, if `open` has run.
    pub fn metadata(&self) -> Option<&ObjectMetadata> {
        self.object.as_ref()
    }

    /// Lazy, finite sequence of byte chunks over the whole object body,
    /// fetched `chunk_size` bytes at a time until an empty fetch signals
    /// the end. The sequence is not restartable.
    pub fn chunks(
        &mut self,
        chunk_size: Option<usize>,
    ) -> impl Stream<Item = Result<Bytes, StorageError>> + Send + '_ {
        let chunk_size = chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        futures::stream::try_unfold((self, 0u64), move |(file, offset)| async move {
            file.open().await?;
            let chunk = file
                .storage
                .fetch_chunk(&file.name, offset, chunk_size)
                .await?;
            if chunk.is_empty() {
                Ok(None)
            } else {
                let next = offset + chunk.len() as u64;
                Ok(Some((chunk, (file, next))))
            }
        })
    }

    /// Read up to `num_bytes` from the cursor, 0 meaning the remainder.
    /// At the end of the stream this returns empty without contacting the
    /// remote store.
    pub async fn read(&mut self, num_bytes: usize) -> Result<Bytes, StorageError> {
        let size = self.size().await?;
        if self.pos >= size {
            return Ok(Bytes::new());
        }
        let remaining = (size - self.pos) as usize;
        let requested = if num_bytes == 0 {
            remaining
        } else {
            num_bytes.min(remaining)
        };
        self.open().await?;
        let data = self
            .storage
            .fetch_chunk(&self.name, self.pos, requested)
            .await?;
        // Forward-only cursor, clamped to the resolved size.
        self.pos = (self.pos + data.len() as u64).min(size);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::TryStreamExt;

    use super::*;
    use crate::config::StorageConfig;
    use crate::protocol::ObjectStore;
    use crate::storage::memory::MemoryStore;
    use crate::storage::FileStorage;

    async fn storage_with(name: &str, data: &str) -> (Arc<MemoryStore>, CloudStorage) {
        let store = Arc::new(MemoryStore::new().with_container("media"));
        store.put("media", name, data.as_bytes().to_vec(), "2024-01-01T00:00:00Z");
        let config = StorageConfig {
            username: "demo".into(),
            api_key: "secret".into(),
            container: "media".into(),
            ..StorageConfig::default()
        };
        let storage = CloudStorage::new(config, store.clone()).await.unwrap();
        (store, storage)
    }

    #[tokio::test]
    async fn open_is_lazy_and_read_drains_the_object() {
        let (_, storage) = storage_with("a.txt", "hello").await;
        let mut file = storage.open("a.txt").await.unwrap();
        assert!(file.metadata().is_none());

        assert_eq!(file.read(0).await.unwrap(), Bytes::from("hello"));
        assert_eq!(file.position(), 5);
        assert!(file.metadata().is_some());
    }

    #[tokio::test]
    async fn read_at_the_end_skips_the_remote_store() {
        let (store, storage) = storage_with("a.txt", "hello").await;
        let mut file = storage.open("a.txt").await.unwrap();
        assert_eq!(file.read(0).await.unwrap().len(), 5);

        // With the object gone, any further remote contact would fail;
        // the exhausted handle answers from its cursor alone.
        let container = store.find_container("media").await.unwrap();
        store.delete_object(&container, "a.txt").await.unwrap();
        assert_eq!(file.read(0).await.unwrap(), Bytes::new());
        assert_eq!(file.read(3).await.unwrap(), Bytes::new());
    }

    #[tokio::test]
    async fn read_clamps_to_the_remainder() {
        let (_, storage) = storage_with("a.txt", "hello").await;
        let mut file = storage.open("a.txt").await.unwrap();
        assert_eq!(file.read(3).await.unwrap(), Bytes::from("hel"));
        // More than remains: clamped to the last two bytes.
        assert_eq!(file.read(10).await.unwrap(), Bytes::from("lo"));
        assert_eq!(file.position(), 5);
    }

    #[tokio::test]
    async fn size_is_fetched_once_and_cached() {
        let (store, storage) = storage_with("a.txt", "hello").await;
        let mut file = storage.open("a.txt").await.unwrap();
        assert_eq!(file.size().await.unwrap(), 5);

        let container = store.find_container("media").await.unwrap();
        store.delete_object(&container, "a.txt").await.unwrap();
        assert_eq!(file.size().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn chunks_walk_the_body_in_fixed_steps() {
        let (_, storage) = storage_with("a.txt", "hello").await;
        let mut file = storage.open("a.txt").await.unwrap();
        let chunks: Vec<Bytes> = file.chunks(Some(2)).try_collect().await.unwrap();
        assert_eq!(
            chunks,
            vec![Bytes::from("he"), Bytes::from("ll"), Bytes::from("o")]
        );
    }

    #[tokio::test]
    async fn default_chunk_size_covers_a_small_object_in_one_step() {
        let (_, storage) = storage_with("a.txt", "hello").await;
        let mut file = storage.open("a.txt").await.unwrap();
        let chunks: Vec<Bytes> = file.chunks(None).try_collect().await.unwrap();
        assert_eq!(chunks, vec![Bytes::from("hello")]);
    }

    #[tokio::test]
    async fn missing_objects_surface_not_found_on_first_use() {
        let (_, storage) = storage_with("a.txt", "hello").await;
        let mut file = storage.open("missing.txt").await.unwrap();
        let err = file.read(0).await.unwrap_err();
        assert!(matches!(err, crate::error::StorageError::NotFound(_)));
    }
}
