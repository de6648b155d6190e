//! Key-value persistence for resume records.

use async_trait::async_trait;
use thiserror::Error;

pub mod redis;

pub use self::redis::RedisKvStore;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// String keys to string values. Values written by this service are JSON documents.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
}
