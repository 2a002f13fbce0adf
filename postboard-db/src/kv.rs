//! Client for the key-value store holding like sets and cached listings.

use redis::{AsyncCommands, Client, RedisError, aio::ConnectionManager};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub type Result<T, E = KvError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Key-value store request failed: {0}")]
    Redis(#[from] RedisError),
}

/// Cheap to clone; all clones share one multiplexed connection that reconnects on its own.
#[derive(Clone)]
pub struct KvClient {
    connection: ConnectionManager,
}

impl Debug for KvClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvClient").finish_non_exhaustive()
    }
}

impl KvClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self { connection })
    }

    /// Returns `false` if `member` was already in the set.
    pub async fn set_add(&self, key: &str, member: i64) -> Result<bool> {
        let mut connection = self.connection.clone();
        let added: i64 = connection.sadd(key, member).await?;

        Ok(added > 0)
    }

    /// Returns `false` if `member` was not in the set.
    pub async fn set_remove(&self, key: &str, member: i64) -> Result<bool> {
        let mut connection = self.connection.clone();
        let removed: i64 = connection.srem(key, member).await?;

        Ok(removed > 0)
    }

    /// A missing set has cardinality zero.
    pub async fn set_cardinality(&self, key: &str) -> Result<i64> {
        let mut connection = self.connection.clone();
        let cardinality: i64 = connection.scard(key).await?;

        Ok(cardinality)
    }

    pub async fn set_is_member(&self, key: &str, member: i64) -> Result<bool> {
        let mut connection = self.connection.clone();
        let is_member: bool = connection.sismember(key, member).await?;

        Ok(is_member)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        connection.del::<_, ()>(key).await?;

        Ok(())
    }

    /// Missing and expired keys both read as `None`.
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut connection = self.connection.clone();
        let value: Option<Vec<u8>> = connection.get(key).await?;

        Ok(value)
    }

    pub async fn set_bytes_with_ttl(&self, key: &str, value: &[u8], ttl_millis: u64) -> Result<()> {
        let mut connection = self.connection.clone();
        connection
            .pset_ex::<_, _, ()>(key, value, ttl_millis)
            .await?;

        Ok(())
    }
}
