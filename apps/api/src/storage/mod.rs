//! File storage: where uploaded resumes and their rendered previews live.
//!
//! The workflow only sees the `FileStore` trait. `AppState` carries an
//! `Arc<dyn FileStore>` chosen at startup from `FILE_STORE` (s3 | local).

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod local;
pub mod s3;

pub use local::LocalFileStore;
pub use s3::S3FileStore;

/// Prefix under which every upload is written, in both backends.
const UPLOAD_PREFIX: &str = "uploads";

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("S3 error: {0}")]
    S3(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// An in-memory file handed to the store, e.g. a multipart upload or a rendered PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Result of a successful upload. `path` is the opaque handle persisted in records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub path: String,
    pub name: String,
    pub size: u64,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<StoredFile, FileStoreError>;

    async fn read(&self, path: &str) -> Result<Bytes, FileStoreError>;
}

/// Builds a unique object key for an upload, keeping the original name readable.
pub(crate) fn object_key(file_name: &str) -> String {
    format!(
        "{}/{}-{}",
        UPLOAD_PREFIX,
        uuid::Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
