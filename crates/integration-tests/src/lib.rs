//! Integration tests for the cart API.
//!
//! The full middleware stack runs in-process against an in-memory cart
//! repository and session store. No database or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartgate-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `identity_channels` - session and token header identities
//! - `claim` - claiming a token's carts into the session
//! - `access_gate` - ownership, cart state and line item checks
//! - `field_access` - protected cart and line item fields
//! - `vary` - cache variance on the token header

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use cartgate_api::config::{ApiConfig, CartTokenConfig};
use cartgate_api::db::MemoryCartRepository;
use cartgate_api::identity::TokenStore;
use cartgate_api::middleware::create_session_layer;
use cartgate_api::routes;
use cartgate_api::state::AppState;
use cartgate_core::{
    Cart, CartId, CartItem, CartToken, CurrencyCode, IdentitySet, IdentityType, OrderItemId,
    OrderState, Price, PurchasableId, StoreId,
};

/// Header carrying the cart token in the default configuration.
pub const TOKEN_HEADER: &str = "commerce-cart-token";

/// Store used for every seeded cart.
pub const STORE_ID: i32 = 1;

/// Configuration for an in-process test server.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://localhost/cartgate_test".to_string()),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        cart_token: CartTokenConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// An in-process cart API with direct access to its storage.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub carts: MemoryCartRepository,
}

impl TestApp {
    /// Build the application with empty storage.
    #[must_use]
    pub fn new() -> Self {
        let config = test_config();
        let carts = MemoryCartRepository::new();
        let state = AppState::new(config.clone(), Arc::new(carts.clone()));
        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let router = routes::app(state.clone(), session_layer);

        Self {
            router,
            state,
            carts,
        }
    }

    /// A client with its own cookie jar.
    #[must_use]
    pub fn browser(&self) -> Browser {
        Browser {
            router: self.router.clone(),
            cookie: None,
            token: None,
        }
    }

    /// Insert a cart in `state` with one line item per entry in `items`.
    pub async fn seed_cart(&self, id: i32, state: OrderState, items: &[i32]) -> Cart {
        let cart_id = CartId::new(id);
        let mut cart = Cart::new(cart_id, StoreId::new(STORE_ID));
        cart.state = state;
        cart.items = items
            .iter()
            .map(|&item_id| CartItem {
                id: OrderItemId::new(item_id),
                order_id: cart_id,
                purchased_entity: PurchasableId::new(100 + item_id),
                title: format!("Item {item_id}"),
                quantity: Decimal::ONE,
                unit_price: Price::new(Decimal::new(499, 2), CurrencyCode::USD),
            })
            .collect();

        self.carts.insert(cart.clone()).await;
        cart
    }

    /// Store an identity under `token` in the shared token store.
    ///
    /// # Panics
    ///
    /// Panics if `token` is not a valid cart token.
    pub async fn grant_token(&self, token: &str, active: &[i32]) {
        let mut identity = IdentitySet::new();
        for &id in active {
            identity.add(CartId::new(id), IdentityType::Active);
        }
        self.state.tokens().set(&parse_token(token), identity).await;
    }

    /// Identity stored under `token`.
    ///
    /// # Panics
    ///
    /// Panics if `token` is not a valid cart token.
    pub async fn token_identity(&self, token: &str) -> IdentitySet {
        self.state.tokens().get(&parse_token(token)).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_token(token: &str) -> CartToken {
    CartToken::parse(token).expect("valid cart token")
}

/// A client keeping the session cookie between requests, like a browser.
pub struct Browser {
    router: Router,
    cookie: Option<String>,
    token: Option<String>,
}

impl Browser {
    /// Send the cart token header on every following request.
    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Stop sending the cart token header.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Send a request with an optional JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the router fails.
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(token) = &self.token {
            builder = builder.header(TOKEN_HEADER, token);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie
                .to_str()
                .expect("ascii cookie")
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string();
            self.cookie = Some(pair);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Create a cart and return its ID.
    ///
    /// # Panics
    ///
    /// Panics if the cart could not be created.
    pub async fn create_cart(&mut self) -> i32 {
        let response = self
            .post("/cart", serde_json::json!({ "store_id": STORE_ID }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        let id = response.json()["id"].as_i64().expect("cart id");
        i32::try_from(id).expect("cart id fits i32")
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Parse the body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }

    /// Tags listed in the `Cache-Tag` header.
    #[must_use]
    pub fn cache_tags(&self) -> Vec<String> {
        self.headers
            .get_all("cache-tag")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split_whitespace().map(str::to_string))
            .collect()
    }

    /// Values of the `Vary` header, lowercased.
    #[must_use]
    pub fn vary(&self) -> Vec<String> {
        self.headers
            .get_all(header::VARY)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(',').map(|v| v.trim().to_ascii_lowercase()))
            .collect()
    }

    /// IDs of the carts in a list response.
    #[must_use]
    pub fn cart_ids(&self) -> Vec<i64> {
        self.json()
            .as_array()
            .map(|carts| carts.iter().filter_map(|c| c["id"].as_i64()).collect())
            .unwrap_or_default()
    }
}
