//! Integration tests for session and token header identities.

use axum::http::StatusCode;
use cartgate_api::db::CartRepository;
use cartgate_core::{CartId, IdentityType, OrderState};
use cartgate_integration_tests::TestApp;

#[tokio::test]
async fn test_session_owns_created_cart() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let id = browser.create_cart().await;

    let list = browser.get("/cart").await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.cart_ids(), vec![i64::from(id)]);

    let show = browser.get(&format!("/cart/{id}")).await;
    assert_eq!(show.status, StatusCode::OK);
    assert_eq!(show.json()["id"], id);
}

#[tokio::test]
async fn test_other_session_cannot_see_cart() {
    let app = TestApp::new();
    let mut owner = app.browser();
    let mut stranger = app.browser();

    let id = owner.create_cart().await;

    assert!(stranger.get("/cart").await.cart_ids().is_empty());
    assert_eq!(
        stranger.get(&format!("/cart/{id}")).await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_cart_created_with_token_is_recorded_in_both_channels() {
    let app = TestApp::new();
    let mut browser = app.browser().with_token("T");

    let id = browser.create_cart().await;

    // Token entry holds the cart.
    let identity = app.token_identity("T").await;
    assert!(identity.contains(CartId::new(id), IdentityType::Active));

    // So does the session, once the header is gone.
    browser.clear_token();
    assert_eq!(browser.get("/cart").await.cart_ids(), vec![i64::from(id)]);

    // A fresh session presenting the token sees it too.
    let mut other_device = app.browser().with_token("T");
    assert_eq!(
        other_device.get(&format!("/cart/{id}")).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_token_header_hides_session_carts() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let session_cart = browser.create_cart().await;

    let mut browser = browser.with_token("unrelated");
    assert!(browser.get("/cart").await.cart_ids().is_empty());
    assert_eq!(
        browser.get(&format!("/cart/{session_cart}")).await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_token_header_reads_token_entry() {
    let app = TestApp::new();
    app.seed_cart(42, OrderState::Draft, &[]).await;
    app.grant_token("T", &[42]).await;

    let mut browser = app.browser().with_token("T");
    assert_eq!(browser.get("/cart").await.cart_ids(), vec![42]);
}

#[tokio::test]
async fn test_malformed_token_header_is_ignored() {
    let app = TestApp::new();
    let mut browser = app.browser();
    let id = browser.create_cart().await;

    // Whitespace only is not a token, so the session identity applies.
    let mut browser = browser.with_token("   ");
    assert_eq!(browser.get("/cart").await.cart_ids(), vec![i64::from(id)]);
}

#[tokio::test]
async fn test_forget_removes_cart_from_identity() {
    let app = TestApp::new();
    let mut browser = app.browser();
    let id = browser.create_cart().await;

    let response = browser.delete(&format!("/cart/{id}")).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert!(browser.get("/cart").await.cart_ids().is_empty());
    assert_eq!(
        browser.get(&format!("/cart/{id}")).await.status,
        StatusCode::FORBIDDEN
    );
    // The order itself is untouched.
    let order = app
        .carts
        .load_cart(CartId::new(id))
        .await
        .expect("load cart");
    assert!(order.is_some());
}

#[tokio::test]
async fn test_list_skips_closed_carts() {
    let app = TestApp::new();
    app.seed_cart(7, OrderState::Completed, &[]).await;
    app.seed_cart(8, OrderState::Draft, &[]).await;
    app.grant_token("T", &[7, 8]).await;

    let mut browser = app.browser().with_token("T");
    assert_eq!(browser.get("/cart").await.cart_ids(), vec![8]);
}
