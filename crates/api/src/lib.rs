//! Cart identity and access resolution service.
//!
//! Decides which carts a storefront requester may act on. Identity comes from
//! the browser session, optionally overridden per request by a cart token
//! header; a token can also be claimed into the session once through a query
//! parameter. Cart API routes pass an access gate and a field write policy.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod state;
