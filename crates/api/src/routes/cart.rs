//! Cart route handlers.
//!
//! Ownership is settled by the access gate before any handler here runs.
//! Handlers only apply the field policy to writes and talk to the repository.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use cartgate_core::{Cart, CartId, CartItem, IdentityType, OrderItemId, StoreId};

use crate::access::FieldOperation;
use crate::context::CartRequestContext;
use crate::error::{AppError, Result};
use crate::identity::IdentityStore;
use crate::state::AppState;

/// Request body for creating a cart.
#[derive(Debug, Deserialize)]
pub struct CreateCartRequest {
    pub store_id: StoreId,
}

// =============================================================================
// Field Helpers
// =============================================================================

/// Refuse the write if any field in `changes` is protected for `entity_type`.
fn ensure_writable(
    state: &AppState,
    ctx: &CartRequestContext,
    entity_type: &str,
    changes: &Map<String, Value>,
) -> Result<()> {
    let forbidden = state.fields().first_forbidden(
        ctx,
        entity_type,
        FieldOperation::Edit,
        changes.keys().map(String::as_str),
    )?;

    match forbidden {
        Some(field) => Err(AppError::Forbidden(format!("field {field} is not writable"))),
        None => Ok(()),
    }
}

fn parse_email(value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(email) if email.trim().is_empty() => Ok(None),
        Value::String(email) if email.contains('@') => Ok(Some(email.trim().to_owned())),
        _ => Err(AppError::BadRequest("email must be an address or null".to_string())),
    }
}

fn parse_quantity(value: &Value) -> Result<Decimal> {
    let quantity = match value {
        Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    };

    match quantity {
        Some(q) if q > Decimal::ZERO => Ok(q),
        _ => Err(AppError::BadRequest(
            "quantity must be a positive number".to_string(),
        )),
    }
}

async fn load(state: &AppState, id: CartId) -> Result<Cart> {
    state
        .carts()
        .load_cart(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("cart {id}")))
}

// =============================================================================
// Handlers
// =============================================================================

/// List the requester's carts that are still open.
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: CartRequestContext,
) -> Result<Json<Vec<Cart>>> {
    let ids = state
        .identity()
        .cart_ids(&ctx, IdentityType::Active)
        .await?;

    let mut carts = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(cart) = state.carts().load_cart(id).await? {
            if cart.is_open_cart() {
                carts.push(cart);
            }
        }
    }

    Ok(Json(carts))
}

/// Create an empty cart owned by the requester.
#[instrument(skip(state, ctx))]
pub async fn create(
    State(state): State<AppState>,
    ctx: CartRequestContext,
    Json(body): Json<CreateCartRequest>,
) -> Result<(StatusCode, Json<Cart>)> {
    let cart = state.carts().create_cart(body.store_id).await?;
    state
        .identity()
        .add_cart_id(&ctx, cart.id, IdentityType::Active)
        .await?;

    tracing::info!(cart_id = %cart.id, store_id = %cart.store_id, "Cart created");
    Ok((StatusCode::CREATED, Json(cart)))
}

/// Show one cart.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<CartId>) -> Result<Json<Cart>> {
    Ok(Json(load(&state, id).await?))
}

/// Update writable cart fields.
#[instrument(skip(state, ctx, changes))]
pub async fn update(
    State(state): State<AppState>,
    ctx: CartRequestContext,
    Path(id): Path<CartId>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<Cart>> {
    ensure_writable(&state, &ctx, Cart::ENTITY_TYPE, &changes)?;

    let mut email = None;
    for (field, value) in &changes {
        match field.as_str() {
            "email" => email = Some(parse_email(value)?),
            other => return Err(AppError::BadRequest(format!("unknown field {other}"))),
        }
    }

    if let Some(email) = email {
        state.carts().update_email(id, email.as_deref()).await?;
    }

    Ok(Json(load(&state, id).await?))
}

/// Forget a cart. The order itself is left alone.
#[instrument(skip(state, ctx))]
pub async fn forget(
    State(state): State<AppState>,
    ctx: CartRequestContext,
    Path(id): Path<CartId>,
) -> Result<StatusCode> {
    state
        .identity()
        .delete_cart_id(&ctx, id, IdentityType::Active)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Update writable line item fields.
#[instrument(skip(state, ctx, changes))]
pub async fn update_item(
    State(state): State<AppState>,
    ctx: CartRequestContext,
    Path((cart_id, item_id)): Path<(CartId, OrderItemId)>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<Cart>> {
    ensure_writable(&state, &ctx, CartItem::ENTITY_TYPE, &changes)?;

    let mut quantity = None;
    for (field, value) in &changes {
        match field.as_str() {
            "quantity" => quantity = Some(parse_quantity(value)?),
            other => return Err(AppError::BadRequest(format!("unknown field {other}"))),
        }
    }

    if let Some(quantity) = quantity {
        state
            .carts()
            .update_item_quantity(cart_id, item_id, quantity)
            .await?;
    }

    Ok(Json(load(&state, cart_id).await?))
}

/// Remove a line item from the cart.
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(CartId, OrderItemId)>,
) -> Result<StatusCode> {
    state.carts().remove_item(cart_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
