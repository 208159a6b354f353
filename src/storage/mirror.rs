//! Local-disk mirroring decorator.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::content::{Content, ContentSource};
use crate::error::StorageError;

use super::{FileStorage, RemoteFile};

/// Wraps an inner storage and additionally writes every saved file under
/// a local root, for pipelines that expect the assets on disk as well.
/// Everything else delegates to the inner storage unchanged.
pub struct MirroredStorage<S> {
    inner: S,
    local_root: PathBuf,
}

impl<S: FileStorage> MirroredStorage<S> {
    pub fn new(inner: S, local_root: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            local_root: local_root.into(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Where the local copy of `name` lands.
    pub fn local_path(&self, name: &str) -> PathBuf {
        self.local_root.join(name)
    }

    async fn write_local_copy(
        &self,
        name: &str,
        content: &mut Content,
    ) -> Result<(), StorageError> {
        let path = self.local_path(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        content.rewind().await?;
        let data = content.read_all().await?;
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }
}

#[async_trait]
impl<S: FileStorage> FileStorage for MirroredStorage<S> {
    async fn open(&self, name: &str) -> Result<RemoteFile, StorageError> {
        self.inner.open(name).await
    }

    async fn save(&self, name: &str, content: &mut Content) -> Result<String, StorageError> {
        let name = self.inner.save(name, content).await?;
        self.write_local_copy(&name, content).await?;
        Ok(name)
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.inner.delete(name).await
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        self.inner.exists(name).await
    }

    async fn list(&self, prefix: &str) -> Result<(Vec<String>, Vec<String>), StorageError> {
        self.inner.list(prefix).await
    }

    async fn size(&self, name: &str) -> Result<u64, StorageError> {
        self.inner.size(name).await
    }

    fn get_valid_name(&self, name: &str) -> String {
        self.inner.get_valid_name(name)
    }

    async fn url(&self, name: &str) -> Result<String, StorageError> {
        self.inner.url(name).await
    }

    async fn modified_time(&self, name: &str) -> Result<NaiveDateTime, StorageError> {
        self.inner.modified_time(name).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::StorageConfig;
    use crate::storage::cloud::CloudStorage;
    use crate::storage::memory::MemoryStore;

    async fn mirrored(
        root: &std::path::Path,
    ) -> (Arc<MemoryStore>, MirroredStorage<CloudStorage>) {
        let store = Arc::new(MemoryStore::new().with_container("media"));
        let config = StorageConfig {
            username: "demo".into(),
            api_key: "secret".into(),
            container: "media".into(),
            ..StorageConfig::default()
        };
        let cloud = CloudStorage::new(config, store.clone()).await.unwrap();
        (store, MirroredStorage::new(cloud, root))
    }

    #[tokio::test]
    async fn save_leaves_an_identical_local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let (store, storage) = mirrored(dir.path()).await;

        let mut content = Content::from_bytes("body {}");
        let name = storage.save("css/site.css", &mut content).await.unwrap();
        assert_eq!(name, "css/site.css");

        assert_eq!(
            store.inspect("media", "css/site.css").unwrap().data,
            bytes::Bytes::from("body {}")
        );
        let local = tokio::fs::read(storage.local_path("css/site.css"))
            .await
            .unwrap();
        assert_eq!(local, b"body {}");
    }

    #[tokio::test]
    async fn reads_and_lookups_delegate_to_the_inner_storage() {
        let dir = tempfile::tempdir().unwrap();
        let (store, storage) = mirrored(dir.path()).await;
        store.put("media", "a.txt", "hello", "2024-01-01T00:00:00Z");

        assert!(storage.exists("a.txt").await.unwrap());
        assert_eq!(storage.size("a.txt").await.unwrap(), 5);
        assert_eq!(storage.get_valid_name("a b.txt"), "a_b.txt");

        let mut file = storage.open("a.txt").await.unwrap();
        assert_eq!(file.read(0).await.unwrap(), bytes::Bytes::from("hello"));
    }

    #[tokio::test]
    async fn a_failed_remote_save_writes_nothing_locally() {
        let dir = tempfile::tempdir().unwrap();
        // The configured container does not exist, so the remote save
        // fails before the local mirror step runs.
        let store = Arc::new(MemoryStore::new());
        let config = StorageConfig {
            username: "demo".into(),
            api_key: "secret".into(),
            container: "media".into(),
            ..StorageConfig::default()
        };
        let cloud = CloudStorage::new(config, store).await.unwrap();
        let storage = MirroredStorage::new(cloud, dir.path());

        let mut content = Content::from_bytes("data");
        assert!(storage.save("a.txt", &mut content).await.is_err());
        assert!(!storage.local_path("a.txt").exists());
    }
}
