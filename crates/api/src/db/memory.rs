//! In-memory cart repository for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use cartgate_core::{Cart, CartId, OrderItemId, StoreId};

use super::{CartRepository, RepositoryError};

/// Cart repository holding carts in a shared map.
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct MemoryCartRepository {
    carts: Arc<RwLock<HashMap<CartId, Cart>>>,
    next_id: Arc<AtomicI32>,
}

impl MemoryCartRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a cart as-is.
    pub async fn insert(&self, cart: Cart) {
        self.next_id.fetch_max(cart.id.as_i32(), Ordering::SeqCst);
        self.carts.write().await.insert(cart.id, cart);
    }
}

#[async_trait]
impl CartRepository for MemoryCartRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn load_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.carts.read().await.get(&id).cloned())
    }

    async fn cart_has_item(
        &self,
        cart_id: CartId,
        item_id: OrderItemId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .carts
            .read()
            .await
            .get(&cart_id)
            .is_some_and(|cart| cart.has_item(item_id)))
    }

    async fn create_cart(&self, store_id: StoreId) -> Result<Cart, RepositoryError> {
        let id = CartId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let cart = Cart::new(id, store_id);
        self.carts.write().await.insert(id, cart.clone());
        Ok(cart)
    }

    async fn update_email(&self, id: CartId, email: Option<&str>) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        let cart = carts.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        cart.email = email.map(str::to_owned);
        Ok(())
    }

    async fn update_item_quantity(
        &self,
        cart_id: CartId,
        item_id: OrderItemId,
        quantity: Decimal,
    ) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        let item = carts
            .get_mut(&cart_id)
            .and_then(|cart| cart.items.iter_mut().find(|item| item.id == item_id))
            .ok_or(RepositoryError::NotFound)?;
        item.quantity = quantity;
        Ok(())
    }

    async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: OrderItemId,
    ) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        let cart = carts.get_mut(&cart_id).ok_or(RepositoryError::NotFound)?;
        let before = cart.items.len();
        cart.items.retain(|item| item.id != item_id);
        if cart.items.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cart_allocates_after_inserted_ids() {
        let repo = MemoryCartRepository::new();
        repo.insert(Cart::new(CartId::new(10), StoreId::new(1))).await;

        let created = repo.create_cart(StoreId::new(1)).await.unwrap();
        assert_eq!(created.id, CartId::new(11));
        assert!(created.is_open_cart());
        assert!(repo.load_cart(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_cart() {
        let repo = MemoryCartRepository::new();
        assert!(repo.load_cart(CartId::new(1)).await.unwrap().is_none());
        assert!(
            !repo
                .cart_has_item(CartId::new(1), OrderItemId::new(1))
                .await
                .unwrap()
        );
        assert!(matches!(
            repo.update_email(CartId::new(1), None).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_email() {
        let repo = MemoryCartRepository::new();
        let cart = repo.create_cart(StoreId::new(1)).await.unwrap();

        repo.update_email(cart.id, Some("shopper@example.com"))
            .await
            .unwrap();

        let loaded = repo.load_cart(cart.id).await.unwrap().unwrap();
        assert_eq!(loaded.email.as_deref(), Some("shopper@example.com"));
    }
}
