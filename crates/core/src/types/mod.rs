//! Core types for cartgate.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod identity;
pub mod price;
pub mod status;
pub mod token;

pub use cart::{Cart, CartItem};
pub use id::*;
pub use identity::{IdentitySet, IdentityType};
pub use price::{CurrencyCode, Price, UnknownCurrency};
pub use status::OrderState;
pub use token::{CartToken, TokenError};
