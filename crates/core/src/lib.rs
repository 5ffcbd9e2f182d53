//! Cartgate Core - Shared types library.
//!
//! This crate provides the domain types used across the cartgate workspace:
//! - `api` - Cart identity, claim, access gate and field policy service
//! - `integration-tests` - End-to-end tests against the assembled router
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, identity sets, cart tokens, order state and cart entities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
