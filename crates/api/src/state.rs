//! Application state shared across handlers.

use std::sync::Arc;

use crate::access::{AccessGate, FieldAccessPolicy};
use crate::config::ApiConfig;
use crate::db::CartRepository;
use crate::identity::{
    CartIdentity, MokaTokenStore, SessionIdentityStore, TokenIdentityStore, TokenStore,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// cart repository, the identity stores and the access policies.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    carts: Arc<dyn CartRepository>,
    tokens: Arc<dyn TokenStore>,
    identity: Arc<CartIdentity>,
    gate: AccessGate,
    fields: FieldAccessPolicy,
}

impl AppState {
    /// Create a new application state with a `moka` token store sized from
    /// `config`.
    #[must_use]
    pub fn new(config: ApiConfig, carts: Arc<dyn CartRepository>) -> Self {
        let tokens: Arc<dyn TokenStore> = Arc::new(MokaTokenStore::new(&config.cart_token));
        Self::with_token_store(config, carts, tokens)
    }

    /// Create a new application state with an explicit token store.
    #[must_use]
    pub fn with_token_store(
        config: ApiConfig,
        carts: Arc<dyn CartRepository>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let identity = Arc::new(TokenIdentityStore::new(
            SessionIdentityStore::new(),
            tokens.clone(),
        ));
        let gate = AccessGate::new(carts.clone(), identity.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                carts,
                tokens,
                identity,
                gate,
                fields: FieldAccessPolicy::new(),
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the cart repository.
    #[must_use]
    pub fn carts(&self) -> &dyn CartRepository {
        self.inner.carts.as_ref()
    }

    /// Get a reference to the shared token store.
    #[must_use]
    pub fn tokens(&self) -> &dyn TokenStore {
        self.inner.tokens.as_ref()
    }

    /// Get a reference to the requester identity store.
    #[must_use]
    pub fn identity(&self) -> &CartIdentity {
        &self.inner.identity
    }

    /// Get a reference to the cart access gate.
    #[must_use]
    pub fn gate(&self) -> &AccessGate {
        &self.inner.gate
    }

    /// Get a reference to the field access policy.
    #[must_use]
    pub fn fields(&self) -> &FieldAccessPolicy {
        &self.inner.fields
    }
}
