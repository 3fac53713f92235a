//! Short-TTL result cache on Redis.
//!
//! Holds one rendered result list per normalized query under
//! `search:{query}`. Freshness is the TTL alone; supersession is full
//! overwrite. The connection is a process-wide multiplexed
//! [`ConnectionManager`], created at startup and injected wherever reads or
//! writes happen — it reconnects on its own after broken connections.

use pricewatch_core::SearchResultItem;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache payload encoding error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Handle to the result cache. Cheap to clone; clones share the underlying
/// multiplexed connection.
#[derive(Clone)]
pub struct ResultCache {
    manager: ConnectionManager,
}

impl ResultCache {
    /// Connects to Redis and verifies the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Redis`] if the URL is invalid or the server is
    /// unreachable.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        let cache = Self { manager };
        cache.ping().await?;
        Ok(cache)
    }

    /// Cache key for a normalized query term.
    #[must_use]
    pub fn search_key(query_term: &str) -> String {
        format!("search:{query_term}")
    }

    /// Returns the cached result list for a query, or `None` on miss.
    ///
    /// An entry that fails to decode is logged and treated as a miss, so the
    /// next store read overwrites it.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Redis`] if Redis cannot be reached.
    pub async fn get(
        &self,
        query_term: &str,
    ) -> Result<Option<Vec<SearchResultItem>>, CacheError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(Self::search_key(query_term)).await?;

        match raw {
            None => Ok(None),
            Some(payload) => match serde_json::from_str(&payload) {
                Ok(items) => Ok(Some(items)),
                Err(error) => {
                    tracing::warn!(
                        query = %query_term,
                        %error,
                        "discarding undecodable cache payload"
                    );
                    Ok(None)
                }
            },
        }
    }

    /// Stores a result list under the query's key with the given TTL.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Payload`] if the results cannot be encoded, or
    /// [`CacheError::Redis`] if the write fails.
    pub async fn set(
        &self,
        query_term: &str,
        results: &[SearchResultItem],
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(results)?;
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(Self::search_key(query_term), payload, ttl_secs)
            .await?;
        Ok(())
    }

    /// Round-trips a PING for health checks.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Redis`] if Redis cannot be reached.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
