//! `PostgreSQL` cart repository.
//!
//! Reads the commerce backend's order tables directly. Queries are checked at
//! runtime because the schema belongs to the backend, not to this service.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use cartgate_core::{
    Cart, CartId, CartItem, CurrencyCode, OrderItemId, OrderState, Price, PurchasableId, StoreId,
};

use super::{CartRepository, RepositoryError};

/// Cart repository backed by the commerce database.
#[derive(Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_id: i32,
    store_id: i32,
    state: String,
    cart: bool,
    order_type: String,
    order_number: Option<String>,
    mail: Option<String>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_item_id: i32,
    order_id: i32,
    purchased_entity: i32,
    title: String,
    quantity: Decimal,
    unit_price_number: Decimal,
    unit_price_currency_code: String,
}

impl PgCartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_item_id, order_id, purchased_entity, title, quantity,
                   unit_price_number, unit_price_currency_code
            FROM commerce_order_item
            WHERE order_id = $1
            ORDER BY order_item_id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(convert_item).collect()
    }
}

fn convert_order(row: OrderRow, items: Vec<CartItem>) -> Cart {
    Cart {
        id: CartId::new(row.order_id),
        store_id: StoreId::new(row.store_id),
        state: OrderState::from(row.state),
        is_cart: row.cart,
        order_type: row.order_type,
        order_number: row.order_number,
        email: row.mail,
        items,
    }
}

fn convert_item(row: OrderItemRow) -> Result<CartItem, RepositoryError> {
    let currency = row
        .unit_price_currency_code
        .parse::<CurrencyCode>()
        .map_err(|e| {
            RepositoryError::DataCorruption(format!("order item {}: {e}", row.order_item_id))
        })?;

    Ok(CartItem {
        id: OrderItemId::new(row.order_item_id),
        order_id: CartId::new(row.order_id),
        purchased_entity: PurchasableId::new(row.purchased_entity),
        title: row.title,
        quantity: row.quantity,
        unit_price: Price::new(row.unit_price_number, currency),
    })
}

const fn ensure_affected(rows_affected: u64) -> Result<(), RepositoryError> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT order_id, store_id, state, cart, order_type, order_number, mail
            FROM commerce_order
            WHERE order_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(id).await?;
                Ok(Some(convert_order(row, items)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn cart_has_item(
        &self,
        cart_id: CartId,
        item_id: OrderItemId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM commerce_order_item
                WHERE order_id = $1 AND order_item_id = $2
            )
            ",
        )
        .bind(cart_id)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn create_cart(&self, store_id: StoreId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO commerce_order (store_id, state, cart, order_type)
            VALUES ($1, $2, TRUE, $3)
            RETURNING order_id, store_id, state, cart, order_type, order_number, mail
            ",
        )
        .bind(store_id)
        .bind(OrderState::Draft.as_str())
        .bind(Cart::DEFAULT_ORDER_TYPE)
        .fetch_one(&self.pool)
        .await?;

        Ok(convert_order(row, Vec::new()))
    }

    #[instrument(skip(self, email))]
    async fn update_email(&self, id: CartId, email: Option<&str>) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE commerce_order SET mail = $2 WHERE order_id = $1")
            .bind(id)
            .bind(email)
            .execute(&self.pool)
            .await?;

        ensure_affected(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn update_item_quantity(
        &self,
        cart_id: CartId,
        item_id: OrderItemId,
        quantity: Decimal,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE commerce_order_item SET quantity = $3
            WHERE order_id = $1 AND order_item_id = $2
            ",
        )
        .bind(cart_id)
        .bind(item_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        ensure_affected(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: OrderItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM commerce_order_item WHERE order_id = $1 AND order_item_id = $2",
        )
        .bind(cart_id)
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        ensure_affected(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order_row(state: &str) -> OrderRow {
        OrderRow {
            order_id: 5,
            store_id: 1,
            state: state.to_string(),
            cart: true,
            order_type: "default".to_string(),
            order_number: None,
            mail: Some("shopper@example.com".to_string()),
        }
    }

    #[test]
    fn test_convert_order() {
        let cart = convert_order(order_row("draft"), Vec::new());
        assert_eq!(cart.id, CartId::new(5));
        assert_eq!(cart.state, OrderState::Draft);
        assert_eq!(cart.email.as_deref(), Some("shopper@example.com"));
        assert!(cart.is_open_cart());
    }

    #[test]
    fn test_convert_order_keeps_workflow_state_as_closed_cart() {
        let cart = convert_order(order_row("needs_payment"), Vec::new());
        assert_eq!(cart.state, OrderState::Other("needs_payment".to_string()));
        assert!(cart.is_cart);
        assert!(!cart.is_open_cart());
    }

    #[test]
    fn test_convert_item_rejects_unknown_currency() {
        let row = OrderItemRow {
            order_item_id: 9,
            order_id: 5,
            purchased_entity: 100,
            title: "Trail mix".to_string(),
            quantity: Decimal::ONE,
            unit_price_number: Decimal::new(499, 2),
            unit_price_currency_code: "ZZZ".to_string(),
        };
        assert!(matches!(
            convert_item(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_ensure_affected() {
        assert!(ensure_affected(1).is_ok());
        assert!(matches!(ensure_affected(0), Err(RepositoryError::NotFound)));
    }
}
