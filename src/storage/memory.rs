//! In-process object store.
//!
//! The development and test backend: containers and objects live in a
//! table behind the same protocol trait the remote stores implement.
//! Containers must be created up front, as they would exist remotely.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::protocol::{ContainerHandle, ObjectMetadata, ObjectStore};

/// One stored object with the metadata the protocol reports.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub etag: String,
    pub content_type: Option<String>,
    pub last_modified: String,
    /// Extra headers the object was uploaded with.
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct Container {
    objects: HashMap<String, StoredObject>,
    public_ttl: Option<u64>,
}

#[derive(Default)]
pub struct MemoryStore {
    containers: RwLock<HashMap<String, Container>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, name: &str) -> Self {
        self.create_container(name);
        self
    }

    pub fn create_container(&self, name: &str) {
        self.containers
            .write()
            .entry(name.to_string())
            .or_default();
    }

    /// Seed an object directly, bypassing the protocol.
    pub fn put(&self, container: &str, name: &str, data: impl Into<Bytes>, last_modified: &str) {
        let data = data.into();
        let etag = format!("{:x}", md5::compute(&data));
        let object = StoredObject {
            data,
            etag,
            content_type: None,
            last_modified: last_modified.to_string(),
            headers: HashMap::new(),
        };
        self.containers
            .write()
            .entry(container.to_string())
            .or_default()
            .objects
            .insert(name.to_string(), object);
    }

    /// Direct look at a stored object, mainly for assertions in tests.
    pub fn inspect(&self, container: &str, name: &str) -> Option<StoredObject> {
        self.containers
            .read()
            .get(container)?
            .objects
            .get(name)
            .cloned()
    }

    /// TTL recorded by `make_container_public`, if the container has been
    /// made public.
    pub fn public_ttl(&self, container: &str) -> Option<u64> {
        self.containers.read().get(container)?.public_ttl
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn authenticate(&self, config: &StorageConfig) -> Result<(), StorageError> {
        // No identity provider in-process; the handshake only checks that
        // credentials were supplied at all.
        if config.username.is_empty() || config.api_key.is_empty() {
            return Err(StorageError::Configuration(
                "credentials are required".into(),
            ));
        }
        Ok(())
    }

    async fn find_container(&self, name: &str) -> Result<ContainerHandle, StorageError> {
        if !self.containers.read().contains_key(name) {
            return Err(StorageError::not_found(format!("container {}", name)));
        }
        Ok(ContainerHandle {
            name: name.to_string(),
            cdn_uri: format!("http://cdn.local/{}", name),
            cdn_ssl_uri: format!("https://cdn-ssl.local/{}", name),
        })
    }

    async fn make_container_public(
        &self,
        container: &ContainerHandle,
        ttl_secs: u64,
    ) -> Result<(), StorageError> {
        let mut containers = self.containers.write();
        let entry = containers
            .get_mut(&container.name)
            .ok_or_else(|| StorageError::not_found(format!("container {}", container.name)))?;
        entry.public_ttl = Some(ttl_secs);
        Ok(())
    }

    async fn list_objects(
        &self,
        container: &ContainerHandle,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError> {
        let containers = self.containers.read();
        let entry = containers
            .get(&container.name)
            .ok_or_else(|| StorageError::not_found(format!("container {}", container.name)))?;
        let mut names: Vec<String> = entry
            .objects
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn object_metadata(
        &self,
        container: &ContainerHandle,
        name: &str,
    ) -> Result<ObjectMetadata, StorageError> {
        let containers = self.containers.read();
        let entry = containers
            .get(&container.name)
            .ok_or_else(|| StorageError::not_found(format!("container {}", container.name)))?;
        let object = entry
            .objects
            .get(name)
            .ok_or_else(|| StorageError::not_found(name))?;
        Ok(ObjectMetadata {
            name: name.to_string(),
            etag: Some(object.etag.clone()),
            bytes: object.data.len() as u64,
            last_modified: object.last_modified.clone(),
            content_type: object.content_type.clone(),
        })
    }

    async fn fetch_object(
        &self,
        container: &ContainerHandle,
        name: &str,
    ) -> Result<Bytes, StorageError> {
        let containers = self.containers.read();
        let entry = containers
            .get(&container.name)
            .ok_or_else(|| StorageError::not_found(format!("container {}", container.name)))?;
        let object = entry
            .objects
            .get(name)
            .ok_or_else(|| StorageError::not_found(name))?;
        Ok(object.data.clone())
    }

    async fn fetch_chunk(
        &self,
        container: &ContainerHandle,
        name: &str,
        offset: u64,
        max_len: usize,
    ) -> Result<Bytes, StorageError> {
        let containers = self.containers.read();
        let entry = containers
            .get(&container.name)
            .ok_or_else(|| StorageError::not_found(format!("container {}", container.name)))?;
        let object = entry
            .objects
            .get(name)
            .ok_or_else(|| StorageError::not_found(name))?;
        let start = (offset as usize).min(object.data.len());
        let end = start.saturating_add(max_len).min(object.data.len());
        Ok(object.data.slice(start..end))
    }

    async fn upload_object(
        &self,
        container: &ContainerHandle,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
        etag: &str,
        extra_headers: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let mut containers = self.containers.write();
        let entry = containers
            .get_mut(&container.name)
            .ok_or_else(|| StorageError::not_found(format!("container {}", container.name)))?;
        let etag = if etag.is_empty() {
            format!("{:x}", md5::compute(&data))
        } else {
            etag.to_string()
        };
        entry.objects.insert(
            name.to_string(),
            StoredObject {
                data,
                etag,
                content_type: content_type.map(str::to_string),
                last_modified: Utc::now().to_rfc3339(),
                headers: extra_headers.clone(),
            },
        );
        Ok(())
    }

    async fn delete_object(
        &self,
        container: &ContainerHandle,
        name: &str,
    ) -> Result<(), StorageError> {
        let mut containers = self.containers.write();
        let entry = containers
            .get_mut(&container.name)
            .ok_or_else(|| StorageError::not_found(format!("container {}", container.name)))?;
        entry
            .objects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn handle(store: &MemoryStore) -> ContainerHandle {
        store.find_container("media").await.unwrap()
    }

    #[tokio::test]
    async fn unknown_containers_are_not_found() {
        let store = MemoryStore::new();
        let err = store.find_container("media").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn fetch_chunk_slices_and_signals_the_end() {
        let store = MemoryStore::new().with_container("media");
        store.put("media", "a.txt", "hello", "2024-01-01T00:00:00Z");
        let container = handle(&store).await;

        assert_eq!(
            store.fetch_chunk(&container, "a.txt", 0, 2).await.unwrap(),
            Bytes::from("he")
        );
        assert_eq!(
            store.fetch_chunk(&container, "a.txt", 4, 10).await.unwrap(),
            Bytes::from("o")
        );
        assert!(store
            .fetch_chunk(&container, "a.txt", 5, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn listing_filters_by_raw_prefix() {
        let store = MemoryStore::new().with_container("media");
        store.put("media", "css/site.css", "a", "2024-01-01T00:00:00Z");
        store.put("media", "js/app.js", "b", "2024-01-01T00:00:00Z");
        let container = handle(&store).await;

        let names = store.list_objects(&container, "css/").await.unwrap();
        assert_eq!(names, vec!["css/site.css"]);
        let all = store.list_objects(&container, "").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_missing_object_reports_not_found() {
        let store = MemoryStore::new().with_container("media");
        let container = handle(&store).await;
        let err = store.delete_object(&container, "a.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn uploads_keep_the_caller_checksum_and_headers() {
        let store = MemoryStore::new().with_container("media");
        let container = handle(&store).await;
        let headers: HashMap<String, String> =
            [("X-Custom".to_string(), "1".to_string())].into_iter().collect();
        store
            .upload_object(
                &container,
                "a.txt",
                Bytes::from("hello"),
                Some("text/plain"),
                "abc123",
                &headers,
            )
            .await
            .unwrap();

        let stored = store.inspect("media", "a.txt").unwrap();
        assert_eq!(stored.etag, "abc123");
        assert_eq!(stored.headers.get("X-Custom").unwrap(), "1");
        assert_eq!(stored.content_type.as_deref(), Some("text/plain"));
    }
}
