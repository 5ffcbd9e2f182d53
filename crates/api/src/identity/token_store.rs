//! Shared ephemeral store of token-scoped identity sets.
//!
//! Entries are keyed by cart token and expire on their own; losing one only
//! loses the ability to resume carts through that token. The carts themselves
//! are untouched.

use async_trait::async_trait;
use moka::future::Cache;

use cartgate_core::{CartToken, IdentitySet};

use crate::config::CartTokenConfig;

/// TTL-bound key/value store shared by every session.
///
/// There is no compare-and-swap: a read-modify-write racing another one on
/// the same token keeps whichever write lands last.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// The identity stored under `token`, or an empty set if none is stored
    /// or the entry has expired.
    async fn get(&self, token: &CartToken) -> IdentitySet;

    /// Replace the identity stored under `token`, restarting its lifetime.
    async fn set(&self, token: &CartToken, identity: IdentitySet);
}

/// In-process token store built on `moka`.
#[derive(Clone)]
pub struct MokaTokenStore {
    cache: Cache<CartToken, IdentitySet>,
}

impl MokaTokenStore {
    /// Create a token store with the configured lifetime and capacity.
    #[must_use]
    pub fn new(config: &CartTokenConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl TokenStore for MokaTokenStore {
    async fn get(&self, token: &CartToken) -> IdentitySet {
        self.cache.get(token).await.unwrap_or_default()
    }

    async fn set(&self, token: &CartToken, identity: IdentitySet) {
        self.cache.insert(token.clone(), identity).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use cartgate_core::{CartId, IdentityType};

    use super::*;

    fn token(value: &str) -> CartToken {
        CartToken::parse(value).unwrap()
    }

    #[tokio::test]
    async fn test_missing_entry_is_empty() {
        let store = MokaTokenStore::new(&CartTokenConfig::default());
        assert!(store.get(&token("never-written")).await.is_empty());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MokaTokenStore::new(&CartTokenConfig::default());
        let mut identity = IdentitySet::new();
        identity.add(CartId::new(5), IdentityType::Active);

        store.set(&token("abc"), identity.clone()).await;

        assert_eq!(store.get(&token("abc")).await, identity);
        assert!(store.get(&token("abd")).await.is_empty());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let config = CartTokenConfig {
            ttl: Duration::from_millis(50),
            ..CartTokenConfig::default()
        };
        let store = MokaTokenStore::new(&config);
        let mut identity = IdentitySet::new();
        identity.add(CartId::new(5), IdentityType::Active);

        store.set(&token("short-lived"), identity).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(store.get(&token("short-lived")).await.is_empty());
    }
}
