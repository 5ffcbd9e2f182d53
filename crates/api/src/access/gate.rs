//! Ownership and state gate for cart API routes.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use cartgate_core::{Cart, CartId, CartItem, IdentityType, OrderItemId};

use super::AccessError;
use crate::context::CartRequestContext;
use crate::db::CartRepository;
use crate::identity::IdentityStore;

/// An entity whose change must invalidate a cached access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CacheTag {
    Order(CartId),
    OrderItem(OrderItemId),
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order(id) => write!(f, "{}:{id}", Cart::ENTITY_TYPE),
            Self::OrderItem(id) => write!(f, "{}:{id}", CartItem::ENTITY_TYPE),
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The route names a cart that does not exist.
    CartNotFound,
    /// The order is no longer a draft cart.
    CartClosed,
    /// The cart is not in the requester's active identity.
    NotOwner,
    /// The route names a line item that is not in the cart.
    ItemNotInCart,
}

impl DenialReason {
    /// Short machine-readable name, used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CartNotFound => "cart_not_found",
            Self::CartClosed => "cart_closed",
            Self::NotOwner => "not_owner",
            Self::ItemNotInCart => "item_not_in_cart",
        }
    }
}

/// Allow or forbid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Allowed,
    Forbidden(DenialReason),
}

/// The gate's answer for one request, with its cache dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    outcome: AccessOutcome,
    cache_tags: BTreeSet<CacheTag>,
}

impl AccessDecision {
    /// An allow decision with no cache dependencies.
    #[must_use]
    pub const fn allowed() -> Self {
        Self {
            outcome: AccessOutcome::Allowed,
            cache_tags: BTreeSet::new(),
        }
    }

    /// A forbid decision with no cache dependencies.
    #[must_use]
    pub const fn forbidden(reason: DenialReason) -> Self {
        Self {
            outcome: AccessOutcome::Forbidden(reason),
            cache_tags: BTreeSet::new(),
        }
    }

    /// Add a cache dependency.
    #[must_use]
    pub fn with_tag(mut self, tag: CacheTag) -> Self {
        self.cache_tags.insert(tag);
        self
    }

    #[must_use]
    pub const fn outcome(&self) -> AccessOutcome {
        self.outcome
    }

    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self.outcome, AccessOutcome::Allowed)
    }

    #[must_use]
    pub const fn cache_tags(&self) -> &BTreeSet<CacheTag> {
        &self.cache_tags
    }

    /// Cache tags as a space-separated header value, or `None` if there are none.
    #[must_use]
    pub fn cache_tag_header(&self) -> Option<String> {
        if self.cache_tags.is_empty() {
            return None;
        }
        Some(
            self.cache_tags
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

/// Raw cart and line item parameters matched by the router.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteCart<'a> {
    pub cart: Option<&'a str>,
    pub item: Option<&'a str>,
}

/// Decides whether a request may act on the cart (and line item) its route names.
#[derive(Clone)]
pub struct AccessGate {
    carts: Arc<dyn CartRepository>,
    identity: Arc<dyn IdentityStore>,
}

impl AccessGate {
    /// Create a gate resolving carts from `carts` and ownership from `identity`.
    pub fn new(carts: Arc<dyn CartRepository>, identity: Arc<dyn IdentityStore>) -> Self {
        Self { carts, identity }
    }

    /// Check raw route parameters. A parameter that is not a valid ID cannot
    /// name an existing entity.
    ///
    /// # Errors
    ///
    /// Returns `AccessError` if the cart or identity could not be loaded.
    pub async fn check_route(
        &self,
        ctx: &CartRequestContext,
        route: RouteCart<'_>,
    ) -> Result<AccessDecision, AccessError> {
        let cart_id = match route.cart {
            None => None,
            Some(raw) => match raw.parse::<CartId>() {
                Ok(id) => Some(id),
                Err(_) if ctx.is_cart_api() => {
                    return Ok(AccessDecision::forbidden(DenialReason::CartNotFound));
                }
                Err(_) => None,
            },
        };

        let item_id = match route.item {
            None => None,
            Some(raw) => match raw.parse::<OrderItemId>() {
                Ok(id) => Some(Ok(id)),
                Err(_) => Some(Err(())),
            },
        };

        match item_id {
            Some(Err(())) => {
                // Unparsable item: decide on the cart alone, then refuse the item.
                let decision = self.check(ctx, cart_id, None).await?;
                if decision.is_allowed() && ctx.is_cart_api() {
                    let mut refused = AccessDecision::forbidden(DenialReason::ItemNotInCart);
                    refused.cache_tags = decision.cache_tags;
                    Ok(refused)
                } else {
                    Ok(decision)
                }
            }
            Some(Ok(item)) => self.check(ctx, cart_id, Some(item)).await,
            None => self.check(ctx, cart_id, None).await,
        }
    }

    /// Decide access to `cart_id` and, optionally, its line item `item_id`.
    ///
    /// 1. No cart → allow. Collection routes filter their own results.
    /// 2. Unknown cart → forbid.
    /// 3. Not a draft cart → forbid, tagged with the cart.
    /// 4. Not in the requester's active identity → forbid, tagged with the cart.
    /// 5. Item not in the cart → forbid, tagged with the item and the cart.
    /// 6. Otherwise allow, tagged with the cart.
    ///
    /// Routes outside the cart API are always allowed.
    ///
    /// # Errors
    ///
    /// Returns `AccessError` if the cart or identity could not be loaded.
    pub async fn check(
        &self,
        ctx: &CartRequestContext,
        cart_id: Option<CartId>,
        item_id: Option<OrderItemId>,
    ) -> Result<AccessDecision, AccessError> {
        if !ctx.is_cart_api() {
            return Ok(AccessDecision::allowed());
        }

        let Some(cart_id) = cart_id else {
            return Ok(AccessDecision::allowed());
        };

        let Some(cart) = self.carts.load_cart(cart_id).await? else {
            return Ok(deny(AccessDecision::forbidden(DenialReason::CartNotFound), cart_id));
        };

        let cart_tag = CacheTag::Order(cart.id);

        if !cart.is_open_cart() {
            return Ok(deny(
                AccessDecision::forbidden(DenialReason::CartClosed).with_tag(cart_tag),
                cart_id,
            ));
        }

        if !self
            .identity
            .has_cart_id(ctx, cart.id, IdentityType::Active)
            .await?
        {
            return Ok(deny(
                AccessDecision::forbidden(DenialReason::NotOwner).with_tag(cart_tag),
                cart_id,
            ));
        }

        if let Some(item_id) = item_id {
            if !self.carts.cart_has_item(cart.id, item_id).await? {
                return Ok(deny(
                    AccessDecision::forbidden(DenialReason::ItemNotInCart)
                        .with_tag(CacheTag::OrderItem(item_id))
                        .with_tag(cart_tag),
                    cart_id,
                ));
            }
        }

        Ok(AccessDecision::allowed().with_tag(cart_tag))
    }
}

fn deny(decision: AccessDecision, cart_id: CartId) -> AccessDecision {
    if let AccessOutcome::Forbidden(reason) = decision.outcome {
        debug!(cart_id = %cart_id, reason = reason.as_str(), "Cart access denied");
    }
    decision
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use tower_sessions::{MemoryStore, Session};

    use cartgate_core::{CurrencyCode, OrderState, Price, PurchasableId, StoreId};

    use super::*;
    use crate::db::MemoryCartRepository;
    use crate::identity::SessionIdentityStore;

    struct Fixture {
        gate: AccessGate,
        carts: MemoryCartRepository,
        identity: SessionIdentityStore,
        ctx: CartRequestContext,
    }

    impl Fixture {
        fn new() -> Self {
            let carts = MemoryCartRepository::new();
            let identity = SessionIdentityStore::new();
            let session = Session::new(None, Arc::new(MemoryStore::default()), None);
            Self {
                gate: AccessGate::new(Arc::new(carts.clone()), Arc::new(identity)),
                carts,
                identity,
                ctx: CartRequestContext::new(session).with_cart_api(true),
            }
        }

        async fn cart(&self, id: i32, state: OrderState, item_ids: &[i32]) -> Cart {
            let mut cart = Cart::new(CartId::new(id), StoreId::new(1));
            cart.state = state;
            cart.items = item_ids
                .iter()
                .map(|item_id| CartItem {
                    id: OrderItemId::new(*item_id),
                    order_id: cart.id,
                    purchased_entity: PurchasableId::new(100),
                    title: "Trail mix".to_string(),
                    quantity: Decimal::ONE,
                    unit_price: Price::new(Decimal::new(1200, 2), CurrencyCode::USD),
                })
                .collect();
            self.carts.insert(cart.clone()).await;
            cart
        }

        async fn own(&self, id: i32) {
            self.identity
                .add_cart_id(&self.ctx, CartId::new(id), IdentityType::Active)
                .await
                .unwrap();
        }

        async fn check(&self, cart: Option<i32>, item: Option<i32>) -> AccessDecision {
            self.gate
                .check(
                    &self.ctx,
                    cart.map(CartId::new),
                    item.map(OrderItemId::new),
                )
                .await
                .unwrap()
        }
    }

    fn tags(decision: &AccessDecision) -> Vec<String> {
        decision.cache_tags().iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_no_cart_is_allowed() {
        let fx = Fixture::new();
        let decision = fx.check(None, None).await;
        assert!(decision.is_allowed());
        assert!(decision.cache_tags().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_cart_is_forbidden() {
        let fx = Fixture::new();
        let decision = fx.check(Some(404), None).await;
        assert_eq!(
            decision.outcome(),
            AccessOutcome::Forbidden(DenialReason::CartNotFound)
        );
    }

    #[tokio::test]
    async fn test_completed_cart_is_forbidden_even_if_owned() {
        let fx = Fixture::new();
        fx.cart(1, OrderState::Completed, &[]).await;
        fx.own(1).await;

        let decision = fx.check(Some(1), None).await;
        assert_eq!(
            decision.outcome(),
            AccessOutcome::Forbidden(DenialReason::CartClosed)
        );
        assert_eq!(tags(&decision), vec!["commerce_order:1"]);
    }

    #[tokio::test]
    async fn test_workflow_specific_state_is_forbidden_even_if_owned() {
        let fx = Fixture::new();
        fx.cart(1, OrderState::Other("needs_payment".to_string()), &[])
            .await;
        fx.own(1).await;

        let decision = fx.check(Some(1), None).await;
        assert_eq!(
            decision.outcome(),
            AccessOutcome::Forbidden(DenialReason::CartClosed)
        );
        assert_eq!(tags(&decision), vec!["commerce_order:1"]);
    }

    #[tokio::test]
    async fn test_non_cart_draft_is_forbidden() {
        let fx = Fixture::new();
        let mut cart = fx.cart(1, OrderState::Draft, &[]).await;
        cart.is_cart = false;
        fx.carts.insert(cart).await;
        fx.own(1).await;

        let decision = fx.check(Some(1), None).await;
        assert_eq!(
            decision.outcome(),
            AccessOutcome::Forbidden(DenialReason::CartClosed)
        );
    }

    #[tokio::test]
    async fn test_unowned_cart_is_forbidden() {
        let fx = Fixture::new();
        fx.cart(1, OrderState::Draft, &[]).await;

        let decision = fx.check(Some(1), None).await;
        assert_eq!(
            decision.outcome(),
            AccessOutcome::Forbidden(DenialReason::NotOwner)
        );
        assert_eq!(tags(&decision), vec!["commerce_order:1"]);
    }

    #[tokio::test]
    async fn test_completed_identity_does_not_grant_access() {
        let fx = Fixture::new();
        fx.cart(1, OrderState::Draft, &[]).await;
        fx.identity
            .add_cart_id(&fx.ctx, CartId::new(1), IdentityType::Completed)
            .await
            .unwrap();

        assert!(!fx.check(Some(1), None).await.is_allowed());
    }

    #[tokio::test]
    async fn test_item_from_other_cart_is_forbidden() {
        let fx = Fixture::new();
        fx.cart(1, OrderState::Draft, &[10]).await;
        fx.cart(2, OrderState::Draft, &[20]).await;
        fx.own(1).await;

        let decision = fx.check(Some(1), Some(20)).await;
        assert_eq!(
            decision.outcome(),
            AccessOutcome::Forbidden(DenialReason::ItemNotInCart)
        );
        assert_eq!(
            tags(&decision),
            vec!["commerce_order:1", "commerce_order_item:20"]
        );
    }

    #[tokio::test]
    async fn test_own_item_is_allowed() {
        let fx = Fixture::new();
        fx.cart(1, OrderState::Draft, &[10]).await;
        fx.own(1).await;

        let decision = fx.check(Some(1), Some(10)).await;
        assert!(decision.is_allowed());
        assert_eq!(decision.cache_tag_header().as_deref(), Some("commerce_order:1"));
    }

    #[tokio::test]
    async fn test_outside_cart_api_is_bypassed() {
        let mut fx = Fixture::new();
        fx.ctx = fx.ctx.clone().with_cart_api(false);

        let decision = fx.check(Some(404), None).await;
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn test_check_route_with_unparsable_ids() {
        let fx = Fixture::new();
        fx.cart(1, OrderState::Draft, &[10]).await;
        fx.own(1).await;

        let bad_cart = fx
            .gate
            .check_route(
                &fx.ctx,
                RouteCart {
                    cart: Some("abc"),
                    item: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            bad_cart.outcome(),
            AccessOutcome::Forbidden(DenialReason::CartNotFound)
        );

        let bad_item = fx
            .gate
            .check_route(
                &fx.ctx,
                RouteCart {
                    cart: Some("1"),
                    item: Some("xyz"),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            bad_item.outcome(),
            AccessOutcome::Forbidden(DenialReason::ItemNotInCart)
        );
        assert_eq!(tags(&bad_item), vec!["commerce_order:1"]);
    }
}
