//! Field-level write policy for cart API routes.
//!
//! The access gate decides whether a requester owns a cart; this policy
//! decides which attributes of an owned cart or line item the API may change.
//! Prices, totals, adjustments and references are computed or owned by the
//! commerce backend and are never writable from the storefront.

use thiserror::Error;
use tracing::{debug, error};

use cartgate_core::{Cart, CartItem};

use crate::context::CartRequestContext;

/// Fields of a cart that may not be edited through the API.
const CART_PROTECTED_FIELDS: &[&str] = &[
    "order_number",
    "store_id",
    "adjustments",
    "coupons",
    "order_total",
    "total_price",
];

/// Fields of a line item that may not be edited through the API.
/// `quantity` is deliberately absent.
const CART_ITEM_PROTECTED_FIELDS: &[&str] = &[
    "purchased_entity",
    "title",
    "adjustments",
    "unit_price",
    "total_price",
];

/// Operation being performed on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOperation {
    View,
    Edit,
}

/// Outcome of a field check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    /// The policy has no objection; the caller's other rules apply.
    Neutral,
    /// The field may not be written through the cart API.
    Forbidden,
}

/// Misconfiguration detected by the field policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldAccessError {
    /// An entity type without field rules was exposed on a cart API route.
    #[error("no cart API field rules for entity type {0}")]
    UnsupportedEntityType(String),
}

/// Restricts which cart and line item fields the cart API may write.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldAccessPolicy;

impl FieldAccessPolicy {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Check one field.
    ///
    /// Outside the cart API the policy is always neutral.
    ///
    /// # Errors
    ///
    /// Returns `FieldAccessError::UnsupportedEntityType` for any entity type
    /// other than carts and cart items. That is a wiring bug, not a denial.
    pub fn check(
        &self,
        ctx: &CartRequestContext,
        entity_type: &str,
        operation: FieldOperation,
        field: &str,
    ) -> Result<FieldAccess, FieldAccessError> {
        if !ctx.is_cart_api() {
            return Ok(FieldAccess::Neutral);
        }

        let protected = match entity_type {
            Cart::ENTITY_TYPE => CART_PROTECTED_FIELDS,
            CartItem::ENTITY_TYPE => CART_ITEM_PROTECTED_FIELDS,
            other => {
                error!(entity_type = other, "Entity type has no cart API field rules");
                return Err(FieldAccessError::UnsupportedEntityType(other.to_owned()));
            }
        };

        if operation == FieldOperation::Edit && protected.contains(&field) {
            debug!(entity_type, field, "Field write refused");
            return Ok(FieldAccess::Forbidden);
        }

        Ok(FieldAccess::Neutral)
    }

    /// Check several fields, returning the first one that is forbidden.
    ///
    /// # Errors
    ///
    /// Returns `FieldAccessError` under the same conditions as [`Self::check`].
    pub fn first_forbidden<'a, I>(
        &self,
        ctx: &CartRequestContext,
        entity_type: &str,
        operation: FieldOperation,
        fields: I,
    ) -> Result<Option<&'a str>, FieldAccessError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for field in fields {
            if self.check(ctx, entity_type, operation, field)? == FieldAccess::Forbidden {
                return Ok(Some(field));
            }
        }
        Ok(None)
    }
}
