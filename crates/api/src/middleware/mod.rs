//! HTTP middleware stack for the cart API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions)
//! 4. Vary annotation (cart token header)
//! 5. Cart claim (merge a claimed token's carts into the session)
//! 6. Routing
//! 7. Cart API marker and access gate (cart routes only)
//!
//! Claim and vary wrap the router, so they run for every request before any
//! route is matched.

pub mod cart_access;
pub mod cart_token;
pub mod session;

pub use cart_access::{CACHE_TAG_HEADER, cart_access_middleware};
pub use cart_token::{claim_middleware, vary_middleware};
pub use session::create_session_layer;
