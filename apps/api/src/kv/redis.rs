use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use super::{KeyValueStore, KvError};

/// Redis backed key-value store. Opens a multiplexed connection per call.
#[derive(Clone)]
pub struct RedisKvStore {
    client: redis::Client,
}

impl RedisKvStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyValueStore for RedisKvStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(key, value).await?;
        debug!("SET {key} ({} bytes)", value.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }
}
