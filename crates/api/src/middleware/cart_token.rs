//! Cart token middleware.
//!
//! - [`claim_middleware`] merges the carts of a token sent in the claim query
//!   parameter into the browser session
//! - [`vary_middleware`] marks responses to requests that send the token
//!   header, valid or not, as varying by that header, so shared caches never
//!   serve one token's carts to another requester

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::VARY},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use cartgate_core::IdentityType;

use crate::context::CartRequestContext;
use crate::identity::{SessionIdentityStore, TokenStore};
use crate::state::AppState;

/// Middleware that claims a token's carts into the session.
///
/// Runs before routing. A missing token entry claims nothing. Failures are
/// logged and never change the response.
pub async fn claim_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.uri().query().is_none() {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    match CartRequestContext::from_parts(&parts, &state.config().cart_token) {
        Ok(ctx) => {
            claim_token_carts(state.tokens(), &SessionIdentityStore::new(), &ctx).await;
        }
        Err(e) => warn!(error = %e, "Skipping cart claim"),
    }

    next.run(Request::from_parts(parts, body)).await
}

/// Add every cart in the claim token's entry to the session identity.
///
/// The merge is a union, so repeating a claim changes nothing. Returns the
/// number of cart IDs that were offered to the session.
pub async fn claim_token_carts(
    tokens: &dyn TokenStore,
    session: &SessionIdentityStore,
    ctx: &CartRequestContext,
) -> usize {
    let Some(token) = ctx.claim_token() else {
        return 0;
    };

    let claimed = tokens.get(token).await;
    if claimed.is_empty() {
        debug!("Claimed cart token has no carts");
        return 0;
    }

    let offered: usize = IdentityType::ALL
        .iter()
        .map(|&kind| claimed.cart_ids(kind).len())
        .sum();

    match session.merge(ctx, &claimed).await {
        Ok(changed) => debug!(offered, changed, "Cart token claimed"),
        Err(e) => warn!(offered, error = %e, "Failed to claim carts into session"),
    }

    offered
}

/// Middleware that appends the cart token header name to `Vary`.
///
/// Keyed on the header being present, not on it holding a valid token, so a
/// malformed token still varies even though the session identity answered.
/// The claim query parameter is part of the URL and already keys the cache.
pub async fn vary_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let header = &state.config().cart_token.header;
    let carries_token = request.headers().contains_key(header);

    let mut response = next.run(request).await;

    if carries_token {
        response
            .headers_mut()
            .append(VARY, HeaderValue::from(header.clone()));
    }

    response
}
