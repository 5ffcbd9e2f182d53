//! HTTP routes for the cart API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                              - Liveness check
//! GET    /health/ready                                        - Readiness check (database)
//!
//! # Cart API (access gate + field policy)
//! GET    /cart                                                - Requester's open carts
//! POST   /cart                                                - Create a cart
//! GET    /cart/{commerce_order}                               - Show a cart
//! PATCH  /cart/{commerce_order}                               - Update cart fields
//! DELETE /cart/{commerce_order}                               - Forget a cart
//! PATCH  /cart/{commerce_order}/items/{commerce_order_item}   - Update a line item
//! DELETE /cart/{commerce_order}/items/{commerce_order_item}   - Remove a line item
//! ```

pub mod cart;
pub mod health;

use axum::{
    Extension, Router,
    middleware::from_fn_with_state,
    routing::{get, patch},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::context::CartApiRoute;
use crate::middleware::{cart_access_middleware, claim_middleware, vary_middleware};
use crate::state::AppState;

/// Create the cart API router.
///
/// Every route here is marked with [`CartApiRoute`] and passes the access
/// gate before its handler runs.
pub fn cart_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(cart::index).post(cart::create))
        .route(
            "/{commerce_order}",
            get(cart::show).patch(cart::update).delete(cart::forget),
        )
        .route(
            "/{commerce_order}/items/{commerce_order_item}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route_layer(from_fn_with_state(state, cart_access_middleware))
        // Outermost route layer, so the gate sees the marker.
        .route_layer(Extension(CartApiRoute))
}

/// Create all routes.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/cart", cart_routes(state))
}

/// Build the complete application.
///
/// The routed application is mounted as the fallback of an outer router, so
/// the claim and vary middleware run before any route is matched.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let routed = routes(state.clone()).with_state(state.clone());

    Router::new()
        .fallback_service(routed)
        .layer(from_fn_with_state(state.clone(), claim_middleware))
        .layer(from_fn_with_state(state, vary_middleware))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
