//! Session-backed identity store.

use async_trait::async_trait;
use tower_sessions::Session;

use cartgate_core::{CartId, IdentitySet, IdentityType};

use super::{IdentityError, IdentityStore};
use crate::context::CartRequestContext;

/// Session key holding the requester's [`IdentitySet`].
pub const SESSION_KEY: &str = "commerce_cart_orders";

/// Identity store keeping cart IDs in the browser session.
///
/// The set is created on the first write and lives as long as the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionIdentityStore;

impl SessionIdentityStore {
    /// Create a session identity store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn load(session: &Session) -> Result<IdentitySet, IdentityError> {
        Ok(session
            .get::<IdentitySet>(SESSION_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save(session: &Session, identity: &IdentitySet) -> Result<(), IdentityError> {
        session.insert(SESSION_KEY, identity).await?;
        Ok(())
    }

    /// Union `other` into the session identity with a single session write.
    ///
    /// Returns `true` if the session gained any cart.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Session` if the session cannot be read or written.
    pub async fn merge(
        &self,
        ctx: &CartRequestContext,
        other: &IdentitySet,
    ) -> Result<bool, IdentityError> {
        let mut identity = Self::load(ctx.session()).await?;
        if !identity.merge(other) {
            return Ok(false);
        }
        Self::save(ctx.session(), &identity).await?;
        Ok(true)
    }
}

#[async_trait]
impl IdentityStore for SessionIdentityStore {
    async fn cart_ids(
        &self,
        ctx: &CartRequestContext,
        kind: IdentityType,
    ) -> Result<Vec<CartId>, IdentityError> {
        let identity = Self::load(ctx.session()).await?;
        Ok(identity.cart_ids(kind).to_vec())
    }

    async fn add_cart_id(
        &self,
        ctx: &CartRequestContext,
        id: CartId,
        kind: IdentityType,
    ) -> Result<(), IdentityError> {
        let mut identity = Self::load(ctx.session()).await?;
        if identity.add(id, kind) {
            Self::save(ctx.session(), &identity).await?;
        }
        Ok(())
    }

    async fn has_cart_id(
        &self,
        ctx: &CartRequestContext,
        id: CartId,
        kind: IdentityType,
    ) -> Result<bool, IdentityError> {
        let identity = Self::load(ctx.session()).await?;
        Ok(identity.contains(id, kind))
    }

    async fn delete_cart_id(
        &self,
        ctx: &CartRequestContext,
        id: CartId,
        kind: IdentityType,
    ) -> Result<(), IdentityError> {
        let mut identity = Self::load(ctx.session()).await?;
        if identity.remove(id, kind) {
            Self::save(ctx.session(), &identity).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn context() -> CartRequestContext {
        CartRequestContext::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    #[tokio::test]
    async fn test_empty_session_has_no_carts() {
        let store = SessionIdentityStore::new();
        let ctx = context();

        assert!(store.cart_ids(&ctx, IdentityType::Active).await.unwrap().is_empty());
        assert!(
            !store
                .has_cart_id(&ctx, CartId::new(1), IdentityType::Active)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_add_has_delete() {
        let store = SessionIdentityStore::new();
        let ctx = context();

        store
            .add_cart_id(&ctx, CartId::new(3), IdentityType::Active)
            .await
            .unwrap();
        store
            .add_cart_id(&ctx, CartId::new(3), IdentityType::Active)
            .await
            .unwrap();
        store
            .add_cart_id(&ctx, CartId::new(4), IdentityType::Completed)
            .await
            .unwrap();

        assert_eq!(
            store.cart_ids(&ctx, IdentityType::Active).await.unwrap(),
            vec![CartId::new(3)]
        );
        assert!(
            store
                .has_cart_id(&ctx, CartId::new(4), IdentityType::Completed)
                .await
                .unwrap()
        );

        store
            .delete_cart_id(&ctx, CartId::new(3), IdentityType::Active)
            .await
            .unwrap();
        assert!(store.cart_ids(&ctx, IdentityType::Active).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_is_a_union() {
        let store = SessionIdentityStore::new();
        let ctx = context();
        store
            .add_cart_id(&ctx, CartId::new(3), IdentityType::Active)
            .await
            .unwrap();

        let mut other = IdentitySet::new();
        other.add(CartId::new(3), IdentityType::Active);
        other.add(CartId::new(5), IdentityType::Active);

        assert!(store.merge(&ctx, &other).await.unwrap());
        assert!(!store.merge(&ctx, &other).await.unwrap());
        assert_eq!(
            store.cart_ids(&ctx, IdentityType::Active).await.unwrap(),
            vec![CartId::new(3), CartId::new(5)]
        );
    }
}
