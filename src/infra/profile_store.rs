//! Object storage for profile images.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::{AppError, AppResult};

const META_SUFFIX: &str = ".meta";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An object and the content type it was stored with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Key/value object store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()>;

    async fn get(&self, key: &str) -> AppResult<Option<StoredObject>>;

    /// Remove `key`. Removing a missing object is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// Files under a root directory; the content type sits in a `.meta` sidecar.
#[derive(Debug, Clone)]
pub struct FsProfileStore {
    root: PathBuf,
}

impl FsProfileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn object_path(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && !key.ends_with(META_SUFFIX)
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(AppError::BadRequest(format!("invalid object key {}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut meta = path.as_os_str().to_owned();
        meta.push(META_SUFFIX);
        PathBuf::from(meta)
    }
}

async fn remove_if_present(path: &Path) -> AppResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::storage(format!("{}: {}", path.display(), e))),
    }
}

#[async_trait]
impl ProfileStore for FsProfileStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::storage(format!("{}: {}", parent.display(), e)))?;
        }

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::storage(format!("{}: {}", path.display(), e)))?;
        tokio::fs::write(Self::meta_path(&path), content_type)
            .await
            .map_err(|e| AppError::storage(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(key, size = bytes.len(), "object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<StoredObject>> {
        let path = self.object_path(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::storage(format!("{}: {}", path.display(), e))),
        };

        let content_type = tokio::fs::read_to_string(Self::meta_path(&path))
            .await
            .map(|text| text.trim().to_string())
            .ok()
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Ok(Some(StoredObject {
            bytes,
            content_type,
        }))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.object_path(key)?;
        remove_if_present(&path).await?;
        remove_if_present(&Self::meta_path(&path)).await
    }
}

/// Objects in a map
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<StoredObject>> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}
