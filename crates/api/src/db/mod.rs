//! Cart storage.
//!
//! Carts are owned by the commerce backend; this service only reads them and
//! forwards the handful of writes the cart API allows. The [`CartRepository`]
//! trait is the seam between the two.
//!
//! # Tables
//!
//! - `commerce_order` - Orders, including draft carts (`cart = true`)
//! - `commerce_order_item` - Line items, referencing `commerce_order.order_id`
//! - `tower_sessions.session` - Browser sessions (tower-sessions)

pub mod carts;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cartgate_core::{Cart, CartId, OrderItemId, StoreId};

pub use carts::PgCartRepository;
pub use memory::MemoryCartRepository;

/// Errors from cart storage.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Storage operations the cart API needs from the commerce backend.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Check that storage is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Load an order with its line items. Returns `None` if no order has this ID.
    async fn load_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError>;

    /// Whether the line item belongs to the order.
    async fn cart_has_item(
        &self,
        cart_id: CartId,
        item_id: OrderItemId,
    ) -> Result<bool, RepositoryError>;

    /// Create an empty draft cart.
    async fn create_cart(&self, store_id: StoreId) -> Result<Cart, RepositoryError>;

    /// Set or clear the cart's contact email.
    async fn update_email(&self, id: CartId, email: Option<&str>) -> Result<(), RepositoryError>;

    /// Change a line item's quantity.
    async fn update_item_quantity(
        &self,
        cart_id: CartId,
        item_id: OrderItemId,
        quantity: Decimal,
    ) -> Result<(), RepositoryError>;

    /// Remove a line item from the cart.
    async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: OrderItemId,
    ) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
