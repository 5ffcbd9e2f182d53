//! Per-request cart context.
//!
//! Every identity, access and field decision takes a [`CartRequestContext`]
//! explicitly instead of reaching for the current request. The context carries
//! the browser session, the cart tokens the client sent, and whether the
//! matched route belongs to the cart API.

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use tower_sessions::Session;

use cartgate_core::CartToken;

use crate::config::CartTokenConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Route marker for the cart API.
///
/// The cart router attaches this extension to every route it owns. Requests
/// without it bypass the access gate and the field access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartApiRoute;

/// Error building a [`CartRequestContext`].
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The session layer did not run for this request.
    #[error("session layer missing from middleware stack")]
    MissingSession,
}

/// The cart-relevant parts of a request.
#[derive(Debug, Clone)]
pub struct CartRequestContext {
    session: Session,
    header_token: Option<CartToken>,
    claim_token: Option<CartToken>,
    cart_api: bool,
}

impl CartRequestContext {
    /// Context with a session and no tokens, outside the cart API.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self {
            session,
            header_token: None,
            claim_token: None,
            cart_api: false,
        }
    }

    /// Set the token sent in the cart token header.
    #[must_use]
    pub fn with_header_token(mut self, token: Option<CartToken>) -> Self {
        self.header_token = token;
        self
    }

    /// Set the token sent in the claim query parameter.
    #[must_use]
    pub fn with_claim_token(mut self, token: Option<CartToken>) -> Self {
        self.claim_token = token;
        self
    }

    /// Mark whether the matched route belongs to the cart API.
    #[must_use]
    pub const fn with_cart_api(mut self, cart_api: bool) -> Self {
        self.cart_api = cart_api;
        self
    }

    /// Build the context from request parts.
    ///
    /// Malformed tokens are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::MissingSession` if the session layer did not run.
    pub fn from_parts(parts: &Parts, config: &CartTokenConfig) -> Result<Self, ContextError> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(ContextError::MissingSession)?;

        let header_token = parts
            .headers
            .get(&config.header)
            .and_then(|value| match value.to_str() {
                Ok(raw) => parse_token(raw, "header"),
                Err(_) => {
                    tracing::warn!("Ignoring cart token header with non-ASCII value");
                    None
                }
            });

        let claim_token = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(params)| {
                params
                    .get(&config.query_param)
                    .and_then(|raw| parse_token(raw, "query"))
            });

        Ok(Self {
            session,
            header_token,
            claim_token,
            cart_api: parts.extensions.get::<CartApiRoute>().is_some(),
        })
    }

    /// The browser session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Token selecting the token identity for this request.
    #[must_use]
    pub const fn header_token(&self) -> Option<&CartToken> {
        self.header_token.as_ref()
    }

    /// Token whose carts should be claimed into the session.
    #[must_use]
    pub const fn claim_token(&self) -> Option<&CartToken> {
        self.claim_token.as_ref()
    }

    /// Whether the matched route belongs to the cart API.
    #[must_use]
    pub const fn is_cart_api(&self) -> bool {
        self.cart_api
    }
}

fn parse_token(raw: &str, channel: &'static str) -> Option<CartToken> {
    match CartToken::parse(raw) {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::warn!(channel, error = %e, "Ignoring malformed cart token");
            None
        }
    }
}

impl FromRequestParts<AppState> for CartRequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, &state.config().cart_token)?)
    }
}
