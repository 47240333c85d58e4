use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};

/// Read-through cache in front of Postgres. Every failure is a cache miss.
#[derive(Clone, Debug)]
pub struct CacheRepository {
    redis_pool: bb8::Pool<redis::Client>,
    ttl_seconds: u64,
}

impl CacheRepository {
    pub fn new(redis_pool: bb8::Pool<redis::Client>, ttl_seconds: u64) -> Self {
        Self {
            redis_pool,
            ttl_seconds,
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.redis_pool.get().await.ok()?;
        conn.get(key).await.ok()
    }

    pub async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut conn = self.redis_pool.get().await?;
        conn.set_ex::<&str, &str, ()>(key, value, self.ttl_seconds)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.redis_pool.get().await?;
        conn.del::<&str, ()>(key).await?;
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "Dropping undecodable cache entry: {:?}", e);
                let _ = self.delete(key).await;
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.set(key, &serde_json::to_string(value)?).await
    }
}

pub fn short_url_key(short_code: &str) -> String {
    format!("short_url:{short_code}")
}
