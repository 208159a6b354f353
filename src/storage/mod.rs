//! Storage backends and the capability contract they satisfy.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::content::Content;
use crate::error::StorageError;

pub mod cloud;
pub mod memory;
pub mod mirror;
pub mod stream;

pub use cloud::CloudStorage;
pub use memory::MemoryStore;
pub use mirror::MirroredStorage;
pub use stream::RemoteFile;

/// Generic file-storage capability contract. `CloudStorage` satisfies it
/// so the adapter can be dropped in wherever a file backend is expected.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Open `name` for reading. No remote call is made until the returned
    /// handle's size or content is actually requested.
    async fn open(&self, name: &str) -> Result<RemoteFile, StorageError>;

    /// Write `content` under `name`, returning the name actually stored.
    async fn save(&self, name: &str, content: &mut Content) -> Result<String, StorageError>;

    /// Delete `name`. Deleting a missing object is success.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// `(directories, files)` under `prefix`. The remote namespace is
    /// flat, so the directory list is always empty.
    async fn list(&self, prefix: &str) -> Result<(Vec<String>, Vec<String>), StorageError>;

    /// Total size of `name` in bytes.
    async fn size(&self, name: &str) -> Result<u64, StorageError>;

    /// A name, derived from `name`, that is safe for this storage.
    fn get_valid_name(&self, name: &str) -> String;

    /// Absolute URL under which the object is served.
    async fn url(&self, name: &str) -> Result<String, StorageError>;

    /// Last-modified in the local time zone with the zone marker stripped,
    /// comparable against locally-stored file timestamps.
    async fn modified_time(&self, name: &str) -> Result<NaiveDateTime, StorageError>;
}
