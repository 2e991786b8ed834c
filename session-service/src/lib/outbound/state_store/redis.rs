use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::session::errors::SessionError;
use crate::session::models::OidcExchangeState;
use crate::session::ports::ExchangeStateStore;

const KEY_PREFIX: &str = "oidc:state:";

/// Exchange-state store shared by every instance behind a load balancer.
///
/// Expiry is delegated to Redis (`EX`), and `GETDEL` gives the atomic take.
#[derive(Clone)]
pub struct RedisExchangeStateStore {
    connection: ConnectionManager,
}

impl RedisExchangeStateStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(url).map_err(storage_error)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(storage_error)?;
        Ok(Self::new(connection))
    }

    fn key(state: &str) -> String {
        format!("{}{}", KEY_PREFIX, state)
    }
}

fn storage_error(err: redis::RedisError) -> SessionError {
    SessionError::Storage(format!("redis: {}", err))
}

#[async_trait]
impl ExchangeStateStore for RedisExchangeStateStore {
    async fn insert_if_absent(
        &self,
        key: &str,
        entry: OidcExchangeState,
        ttl: Duration,
    ) -> Result<bool, SessionError> {
        let payload =
            serde_json::to_string(&entry).map_err(|e| SessionError::Internal(e.to_string()))?;
        let mut connection = self.connection.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::key(key))
            .arg(payload)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut connection)
            .await
            .map_err(storage_error)?;

        Ok(reply.is_some())
    }

    async fn take(&self, key: &str) -> Result<Option<OidcExchangeState>, SessionError> {
        let mut connection = self.connection.clone();

        let payload: Option<String> = redis::cmd("GETDEL")
            .arg(Self::key(key))
            .query_async(&mut connection)
            .await
            .map_err(storage_error)?;

        payload
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| {
                    tracing::error!(error = %e, "Corrupt OIDC exchange state in redis");
                    SessionError::Internal(e.to_string())
                })
            })
            .transpose()
    }

    async fn sweep_expired(&self) -> Result<usize, SessionError> {
        Ok(0)
    }
}
