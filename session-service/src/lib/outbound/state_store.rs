use std::time::Duration;

use async_trait::async_trait;

use crate::session::errors::SessionError;
use crate::session::models::OidcExchangeState;
use crate::session::ports::ExchangeStateStore;

pub mod memory;
pub mod redis;

pub use memory::InMemoryExchangeStateStore;
pub use self::redis::RedisExchangeStateStore;

/// Exchange-state store picked from configuration at startup.
pub enum ExchangeStateBackend {
    Memory(InMemoryExchangeStateStore),
    Redis(RedisExchangeStateStore),
}

impl ExchangeStateBackend {
    /// Redis when a URL is configured, otherwise in-process.
    pub async fn from_url(redis_url: Option<&str>) -> Result<Self, SessionError> {
        match redis_url {
            Some(url) => Ok(Self::Redis(RedisExchangeStateStore::connect(url).await?)),
            None => Ok(Self::Memory(InMemoryExchangeStateStore::new())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }
}

#[async_trait]
impl ExchangeStateStore for ExchangeStateBackend {
    async fn insert_if_absent(
        &self,
        key: &str,
        entry: OidcExchangeState,
        ttl: Duration,
    ) -> Result<bool, SessionError> {
        match self {
            Self::Memory(store) => store.insert_if_absent(key, entry, ttl).await,
            Self::Redis(store) => store.insert_if_absent(key, entry, ttl).await,
        }
    }

    async fn take(&self, key: &str) -> Result<Option<OidcExchangeState>, SessionError> {
        match self {
            Self::Memory(store) => store.take(key).await,
            Self::Redis(store) => store.take(key).await,
        }
    }

    async fn sweep_expired(&self) -> Result<usize, SessionError> {
        match self {
            Self::Memory(store) => store.sweep_expired().await,
            Self::Redis(store) => store.sweep_expired().await,
        }
    }
}
