//! Token-aware identity store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use cartgate_core::{CartId, IdentityType};

use super::{IdentityError, IdentityStore, TokenStore};
use crate::context::CartRequestContext;

/// Identity store that redirects to a token's identity when the request
/// carries a cart token header.
///
/// - Reads: token header present → the token's entry only (empty if missing);
///   otherwise the wrapped store.
/// - Writes: always applied to the wrapped store so the browser session keeps
///   its carts; with a token header they are also applied to the token's entry.
#[derive(Clone)]
pub struct TokenIdentityStore<S> {
    inner: S,
    tokens: Arc<dyn TokenStore>,
}

impl<S> TokenIdentityStore<S> {
    /// Wrap `inner`, using `tokens` for token-scoped identities.
    pub fn new(inner: S, tokens: Arc<dyn TokenStore>) -> Self {
        Self { inner, tokens }
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: IdentityStore> IdentityStore for TokenIdentityStore<S> {
    async fn cart_ids(
        &self,
        ctx: &CartRequestContext,
        kind: IdentityType,
    ) -> Result<Vec<CartId>, IdentityError> {
        match ctx.header_token() {
            Some(token) => Ok(self.tokens.get(token).await.cart_ids(kind).to_vec()),
            None => self.inner.cart_ids(ctx, kind).await,
        }
    }

    async fn add_cart_id(
        &self,
        ctx: &CartRequestContext,
        id: CartId,
        kind: IdentityType,
    ) -> Result<(), IdentityError> {
        self.inner.add_cart_id(ctx, id, kind).await?;

        if let Some(token) = ctx.header_token() {
            let mut identity = self.tokens.get(token).await;
            if identity.add(id, kind) {
                debug!(cart_id = %id, kind = kind.as_str(), "Added cart to token identity");
            }
            // Always written back so the entry's lifetime restarts.
            self.tokens.set(token, identity).await;
        }

        Ok(())
    }

    async fn has_cart_id(
        &self,
        ctx: &CartRequestContext,
        id: CartId,
        kind: IdentityType,
    ) -> Result<bool, IdentityError> {
        match ctx.header_token() {
            Some(token) => Ok(self.tokens.get(token).await.contains(id, kind)),
            None => self.inner.has_cart_id(ctx, id, kind).await,
        }
    }

    async fn delete_cart_id(
        &self,
        ctx: &CartRequestContext,
        id: CartId,
        kind: IdentityType,
    ) -> Result<(), IdentityError> {
        self.inner.delete_cart_id(ctx, id, kind).await?;

        if let Some(token) = ctx.header_token() {
            let mut identity = self.tokens.get(token).await;
            if identity.remove(id, kind) {
                self.tokens.set(token, identity).await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_sessions::{MemoryStore, Session};

    use cartgate_core::{CartToken, IdentitySet};

    use super::*;
    use crate::config::CartTokenConfig;
    use crate::identity::{MokaTokenStore, SessionIdentityStore};

    struct Fixture {
        store: TokenIdentityStore<SessionIdentityStore>,
        tokens: Arc<MokaTokenStore>,
        session: Session,
    }

    impl Fixture {
        fn new() -> Self {
            let tokens = Arc::new(MokaTokenStore::new(&CartTokenConfig::default()));
            Self {
                store: TokenIdentityStore::new(SessionIdentityStore::new(), tokens.clone()),
                tokens,
                session: Session::new(None, Arc::new(MemoryStore::default()), None),
            }
        }

        fn without_token(&self) -> CartRequestContext {
            CartRequestContext::new(self.session.clone())
        }

        fn with_token(&self, token: &str) -> CartRequestContext {
            CartRequestContext::new(self.session.clone())
                .with_header_token(Some(CartToken::parse(token).unwrap()))
        }
    }

    #[tokio::test]
    async fn test_without_token_reads_session() {
        let fx = Fixture::new();
        let session_store = SessionIdentityStore::new();
        session_store
            .add_cart_id(&fx.without_token(), CartId::new(3), IdentityType::Active)
            .await
            .unwrap();

        let ids = fx
            .store
            .cart_ids(&fx.without_token(), IdentityType::Active)
            .await
            .unwrap();
        assert_eq!(ids, vec![CartId::new(3)]);
    }

    #[tokio::test]
    async fn test_with_token_ignores_session() {
        let fx = Fixture::new();
        fx.store
            .inner()
            .add_cart_id(&fx.without_token(), CartId::new(3), IdentityType::Active)
            .await
            .unwrap();

        let mut token_identity = IdentitySet::new();
        token_identity.add(CartId::new(9), IdentityType::Active);
        fx.tokens
            .set(&CartToken::parse("tok").unwrap(), token_identity)
            .await;

        let ctx = fx.with_token("tok");
        assert_eq!(
            fx.store.cart_ids(&ctx, IdentityType::Active).await.unwrap(),
            vec![CartId::new(9)]
        );
        assert!(
            !fx.store
                .has_cart_id(&ctx, CartId::new(3), IdentityType::Active)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_unknown_token_is_empty() {
        let fx = Fixture::new();
        fx.store
            .add_cart_id(&fx.without_token(), CartId::new(3), IdentityType::Active)
            .await
            .unwrap();

        let ctx = fx.with_token("never-seen");
        assert!(fx.store.cart_ids(&ctx, IdentityType::Active).await.unwrap().is_empty());
        assert!(
            fx.store
                .cart_ids(&ctx, IdentityType::Completed)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_add_with_token_writes_both_channels() {
        let fx = Fixture::new();
        fx.store
            .add_cart_id(&fx.with_token("tok"), CartId::new(5), IdentityType::Active)
            .await
            .unwrap();

        assert!(
            fx.store
                .inner()
                .has_cart_id(&fx.without_token(), CartId::new(5), IdentityType::Active)
                .await
                .unwrap()
        );

        // A later request with the same token on a different session.
        let other_session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let later = CartRequestContext::new(other_session)
            .with_header_token(Some(CartToken::parse("tok").unwrap()));
        assert_eq!(
            fx.store.cart_ids(&later, IdentityType::Active).await.unwrap(),
            vec![CartId::new(5)]
        );
    }

    #[tokio::test]
    async fn test_delete_with_token_removes_from_both_channels() {
        let fx = Fixture::new();
        let ctx = fx.with_token("tok");
        fx.store
            .add_cart_id(&ctx, CartId::new(5), IdentityType::Active)
            .await
            .unwrap();

        fx.store
            .delete_cart_id(&ctx, CartId::new(5), IdentityType::Active)
            .await
            .unwrap();

        assert!(fx.store.cart_ids(&ctx, IdentityType::Active).await.unwrap().is_empty());
        assert!(
            fx.store
                .cart_ids(&fx.without_token(), IdentityType::Active)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_rewriting_known_cart_restarts_entry_lifetime() {
        let config = CartTokenConfig {
            ttl: std::time::Duration::from_millis(300),
            ..CartTokenConfig::default()
        };
        let tokens = Arc::new(MokaTokenStore::new(&config));
        let store = TokenIdentityStore::new(SessionIdentityStore::new(), tokens.clone());
        let ctx = CartRequestContext::new(Session::new(None, Arc::new(MemoryStore::default()), None))
            .with_header_token(Some(CartToken::parse("refresh-me").unwrap()));

        store
            .add_cart_id(&ctx, CartId::new(5), IdentityType::Active)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        // Already present: nothing changes but the entry is written again.
        store
            .add_cart_id(&ctx, CartId::new(5), IdentityType::Active)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        // Past the first write's lifetime, within the second's.
        assert!(
            store
                .has_cart_id(&ctx, CartId::new(5), IdentityType::Active)
                .await
                .unwrap()
        );
    }
}
