//! Cart identity resolution.
//!
//! Answers "which carts may this requester act on" from two channels:
//!
//! - [`SessionIdentityStore`] - cart IDs kept in the browser session
//! - [`TokenIdentityStore`] - decorates another store; when the request carries
//!   a cart token header, reads come from the token's entry in the shared
//!   [`TokenStore`] and writes go to both
//!
//! The two channels are never mixed on reads: a request with a token header
//! sees only the token's carts.

pub mod session;
pub mod token;
pub mod token_store;

use async_trait::async_trait;
use thiserror::Error;

use cartgate_core::{CartId, IdentityType};

use crate::context::CartRequestContext;

pub use session::SessionIdentityStore;
pub use token::TokenIdentityStore;
pub use token_store::{MokaTokenStore, TokenStore};

/// Identity store used by the running service.
pub type CartIdentity = TokenIdentityStore<SessionIdentityStore>;

/// Errors from identity storage.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The session could not be read or written.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Read/write access to the cart IDs a requester owns.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Cart IDs of the given type, in insertion order.
    async fn cart_ids(
        &self,
        ctx: &CartRequestContext,
        kind: IdentityType,
    ) -> Result<Vec<CartId>, IdentityError>;

    /// Record `id` under `kind`. Adding an ID that is already present is a no-op.
    async fn add_cart_id(
        &self,
        ctx: &CartRequestContext,
        id: CartId,
        kind: IdentityType,
    ) -> Result<(), IdentityError>;

    /// Whether `id` is recorded under `kind`.
    async fn has_cart_id(
        &self,
        ctx: &CartRequestContext,
        id: CartId,
        kind: IdentityType,
    ) -> Result<bool, IdentityError>;

    /// Forget `id` under `kind`.
    async fn delete_cart_id(
        &self,
        ctx: &CartRequestContext,
        id: CartId,
        kind: IdentityType,
    ) -> Result<(), IdentityError>;
}
