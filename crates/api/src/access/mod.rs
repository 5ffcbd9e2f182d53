//! Cart API authorization.
//!
//! - [`AccessGate`] - may this request act on the cart (and line item) its route names?
//! - [`FieldAccessPolicy`] - which fields of an owned cart may it write?
//!
//! Denials are ordinary values. Only infrastructure failures and
//! misconfiguration are errors.

pub mod fields;
pub mod gate;

use thiserror::Error;

use crate::db::RepositoryError;
use crate::identity::IdentityError;

pub use fields::{FieldAccess, FieldAccessError, FieldAccessPolicy, FieldOperation};
pub use gate::{AccessDecision, AccessGate, AccessOutcome, CacheTag, DenialReason, RouteCart};

/// Failure to evaluate an access decision.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}
