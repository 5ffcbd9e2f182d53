//! Cart and line item entities.
//!
//! These mirror the externally owned order storage closely enough for access
//! decisions: state, cart flag, store and line item membership.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartId, OrderItemId, PurchasableId, StoreId};
use super::price::Price;
use super::status::OrderState;

/// A draft order flagged as a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub store_id: StoreId,
    pub state: OrderState,
    /// Whether the order is flagged as a cart. Orders created through the
    /// admin interface are drafts but not carts.
    pub is_cart: bool,
    pub order_type: String,
    pub order_number: Option<String>,
    pub email: Option<String>,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Entity type ID used for cache tags and field access dispatch.
    pub const ENTITY_TYPE: &'static str = "commerce_order";

    /// Order type assigned to carts created through the API.
    pub const DEFAULT_ORDER_TYPE: &'static str = "default";

    /// Create an empty draft cart.
    #[must_use]
    pub fn new(id: CartId, store_id: StoreId) -> Self {
        Self {
            id,
            store_id,
            state: OrderState::Draft,
            is_cart: true,
            order_type: Self::DEFAULT_ORDER_TYPE.to_owned(),
            order_number: None,
            email: None,
            items: Vec::new(),
        }
    }

    /// Whether this order can still be read and changed through the cart API.
    #[must_use]
    pub fn is_open_cart(&self) -> bool {
        self.state == OrderState::Draft && self.is_cart
    }

    /// Whether the line item belongs to this cart.
    #[must_use]
    pub fn has_item(&self, item_id: OrderItemId) -> bool {
        self.items.iter().any(|item| item.id == item_id)
    }
}

/// A line item in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: OrderItemId,
    pub order_id: CartId,
    pub purchased_entity: PurchasableId,
    pub title: String,
    pub quantity: Decimal,
    pub unit_price: Price,
}

impl CartItem {
    /// Entity type ID used for cache tags and field access dispatch.
    pub const ENTITY_TYPE: &'static str = "commerce_order_item";
}
