use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use super::{object_key, FileStore, FileStoreError, StoredFile, UploadFile};

/// Filesystem backed file store for development without an object store.
/// Paths handed out are relative to `root`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FileStoreError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(FileStoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn upload(&self, file: &UploadFile) -> Result<StoredFile, FileStoreError> {
        let key = object_key(&file.name);
        let target = self.resolve(&key)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &file.bytes).await?;

        info!("Stored {} at {}", file.name, target.display());

        Ok(StoredFile {
            path: key,
            name: file.name.clone(),
            size: file.bytes.len() as u64,
        })
    }

    async fn read(&self, path: &str) -> Result<Bytes, FileStoreError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileStoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(FileStoreError::Io(e)),
        }
    }
}
