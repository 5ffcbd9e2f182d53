//! Access gate middleware for cart API routes.
//!
//! Attached with `route_layer` so it only runs for matched cart routes, after
//! the path parameters are known. Every response it lets through or produces
//! carries the gate's cache dependencies in a `Cache-Tag` header.

use axum::{
    extract::{RawPathParams, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use cartgate_core::{Cart, CartItem};

use crate::access::{AccessDecision, AccessOutcome, RouteCart};
use crate::context::CartRequestContext;
use crate::error::AppError;
use crate::state::AppState;

/// Response header listing the entities a response depends on.
pub const CACHE_TAG_HEADER: &str = "cache-tag";

/// Middleware that runs the access gate for the cart named by the route.
///
/// # Errors
///
/// Returns `AppError::Access` if the gate could not load the cart or the
/// requester's identity.
pub async fn cart_access_middleware(
    State(state): State<AppState>,
    ctx: CartRequestContext,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mut route = RouteCart::default();
    for (key, value) in &params {
        match key {
            Cart::ENTITY_TYPE => route.cart = Some(value),
            CartItem::ENTITY_TYPE => route.item = Some(value),
            _ => {}
        }
    }

    let decision = state.gate().check_route(&ctx, route).await?;

    let mut response = match decision.outcome() {
        AccessOutcome::Allowed => next.run(request).await,
        AccessOutcome::Forbidden(reason) => {
            (StatusCode::FORBIDDEN, format!("Forbidden: {}", reason.as_str())).into_response()
        }
    };

    attach_cache_tags(&mut response, &decision);
    Ok(response)
}

fn attach_cache_tags(response: &mut Response, decision: &AccessDecision) {
    let Some(tags) = decision.cache_tag_header() else {
        return;
    };

    match HeaderValue::from_str(&tags) {
        Ok(value) => {
            response.headers_mut().append(CACHE_TAG_HEADER, value);
        }
        Err(e) => tracing::warn!(error = %e, "Cache tags are not a valid header value"),
    }
}
