use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::session::errors::SessionError;
use crate::session::models::OidcExchangeState;
use crate::session::ports::ExchangeStateStore;

struct StoredState {
    state: OidcExchangeState,
    expires_at: Instant,
}

impl StoredState {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-local exchange-state store.
///
/// Only suitable for a single instance: a callback routed to another replica
/// will not find the state.
#[derive(Default)]
pub struct InMemoryExchangeStateStore {
    entries: DashMap<String, StoredState>,
}

impl InMemoryExchangeStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ExchangeStateStore for InMemoryExchangeStateStore {
    async fn insert_if_absent(
        &self,
        key: &str,
        entry: OidcExchangeState,
        ttl: Duration,
    ) -> Result<bool, SessionError> {
        let stored = StoredState {
            state: entry,
            expires_at: Instant::now() + ttl,
        };

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(stored);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(stored);
                Ok(true)
            }
        }
    }

    async fn take(&self, key: &str) -> Result<Option<OidcExchangeState>, SessionError> {
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, stored)| !stored.is_expired())
            .map(|(_, stored)| stored.state))
    }

    async fn sweep_expired(&self) -> Result<usize, SessionError> {
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired());
        Ok(before.saturating_sub(self.entries.len()))
    }
}
