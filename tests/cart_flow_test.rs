//! Integration tests for the cart store: stock-bounded adds and updates,
//! owner-keyed isolation, and the post-login anonymous-cart merge.

mod common;

use assert_matches::assert_matches;
use common::TestContext;
use queops_api::{errors::ServiceError, services::CartOwner};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn customer() -> CartOwner {
    CartOwner::Customer(Uuid::new_v4())
}

fn anonymous(token: &str) -> CartOwner {
    CartOwner::Anonymous(token.to_string())
}

#[tokio::test]
async fn add_item_creates_line_and_resolves_promotional_price() {
    let ctx = TestContext::new().await;
    let product = ctx
        .seed_product("Dipirona 500mg", dec!(12.90), Some(dec!(9.90)), 50)
        .await;
    let owner = customer();

    ctx.cart.add_item(&owner, product.id, 3).await.unwrap();

    let cart = ctx.cart.get_cart(&owner).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.items[0].unit_price, dec!(9.90));
    assert_eq!(cart.items[0].line_total, dec!(29.70));
    assert_eq!(cart.total, dec!(29.70));
    assert_eq!(cart.item_count, 3);
}

#[tokio::test]
async fn duplicate_add_merges_quantities() {
    let ctx = TestContext::new().await;
    let product = ctx
        .seed_product("Paracetamol 750mg", dec!(15.50), None, 10)
        .await;
    let owner = customer();

    ctx.cart.add_item(&owner, product.id, 2).await.unwrap();
    ctx.cart.add_item(&owner, product.id, 3).await.unwrap();

    let cart = ctx.cart.get_cart(&owner).await.unwrap();
    assert_eq!(cart.items.len(), 1, "one line per (owner, product)");
    assert_eq!(cart.items[0].quantity, 5);
}

#[tokio::test]
async fn merged_add_is_bounded_by_stock() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Omeprazol 20mg", dec!(24.90), None, 5).await;
    let owner = customer();

    ctx.cart.add_item(&owner, product.id, 4).await.unwrap();
    let err = ctx.cart.add_item(&owner, product.id, 2).await.unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(msg) => {
        assert!(msg.contains("Omeprazol"));
    });

    // The existing line is untouched by the failed add.
    let cart = ctx.cart.get_cart(&owner).await.unwrap();
    assert_eq!(cart.items[0].quantity, 4);
}

#[tokio::test]
async fn add_rejects_non_positive_quantity() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Complexo B", dec!(29.90), None, 10).await;
    let owner = customer();

    assert_matches!(
        ctx.cart.add_item(&owner, product.id, 0).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        ctx.cart.add_item(&owner, product.id, -2).await,
        Err(ServiceError::InvalidInput(_))
    );
}

#[tokio::test]
async fn add_rejects_missing_or_inactive_product() {
    let ctx = TestContext::new().await;
    let owner = customer();

    assert_matches!(
        ctx.cart.add_item(&owner, Uuid::new_v4(), 1).await,
        Err(ServiceError::NotFound(_))
    );

    let inactive = ctx.seed_inactive_product("Descontinuado", dec!(9.90)).await;
    assert_matches!(
        ctx.cart.add_item(&owner, inactive.id, 1).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn update_quantity_replaces_and_validates() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Ibuprofeno 600mg", dec!(22.00), None, 6).await;
    let owner = customer();

    ctx.cart.add_item(&owner, product.id, 2).await.unwrap();
    ctx.cart
        .update_item_quantity(&owner, product.id, 5)
        .await
        .unwrap();

    let cart = ctx.cart.get_cart(&owner).await.unwrap();
    assert_eq!(cart.items[0].quantity, 5);

    assert_matches!(
        ctx.cart.update_item_quantity(&owner, product.id, 7).await,
        Err(ServiceError::InsufficientStock(_))
    );
    assert_matches!(
        ctx.cart.update_item_quantity(&owner, product.id, 0).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        ctx.cart.update_item_quantity(&owner, Uuid::new_v4(), 1).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn remove_item_deletes_line() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Shampoo Anticaspa", dec!(32.50), None, 10).await;
    let owner = customer();

    ctx.cart.add_item(&owner, product.id, 1).await.unwrap();
    ctx.cart.remove_item(&owner, product.id).await.unwrap();

    let cart = ctx.cart.get_cart(&owner).await.unwrap();
    assert!(cart.items.is_empty());

    assert_matches!(
        ctx.cart.remove_item(&owner, product.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn clear_cart_reports_count_and_empty_totals_are_zero() {
    let ctx = TestContext::new().await;
    let a = ctx.seed_product("Produto A", dec!(10.00), None, 10).await;
    let b = ctx.seed_product("Produto B", dec!(20.00), None, 10).await;
    let owner = customer();

    ctx.cart.add_item(&owner, a.id, 1).await.unwrap();
    ctx.cart.add_item(&owner, b.id, 2).await.unwrap();

    let removed = ctx.cart.clear_cart(&owner).await.unwrap();
    assert_eq!(removed, 2);

    assert_eq!(ctx.cart.cart_total(&owner).await.unwrap(), dec!(0));
    assert_eq!(ctx.cart.item_count(&owner).await.unwrap(), 0);

    // Clearing an already-empty cart removes nothing.
    assert_eq!(ctx.cart.clear_cart(&owner).await.unwrap(), 0);
}

#[tokio::test]
async fn carts_are_isolated_per_owner() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Vitamina C", dec!(18.90), None, 50).await;
    let alice = customer();
    let bob = customer();
    let guest = anonymous("guest-token");

    ctx.cart.add_item(&alice, product.id, 1).await.unwrap();
    ctx.cart.add_item(&bob, product.id, 2).await.unwrap();
    ctx.cart.add_item(&guest, product.id, 3).await.unwrap();

    assert_eq!(ctx.cart.item_count(&alice).await.unwrap(), 1);
    assert_eq!(ctx.cart.item_count(&bob).await.unwrap(), 2);
    assert_eq!(ctx.cart.item_count(&guest).await.unwrap(), 3);
}

// ==================== Anonymous-cart merge ====================

#[tokio::test]
async fn merge_transfers_lines_the_customer_does_not_hold() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Protetor Solar", dec!(54.90), None, 20).await;
    let customer_id = Uuid::new_v4();

    let guest = anonymous("sess-1");
    ctx.cart.add_item(&guest, product.id, 2).await.unwrap();

    let merged = ctx
        .cart
        .merge_anonymous_into_customer("sess-1", customer_id)
        .await
        .unwrap();
    assert_eq!(merged, 1);

    let owner = CartOwner::Customer(customer_id);
    let cart = ctx.cart.get_cart(&owner).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);

    // The anonymous cart is gone.
    assert_eq!(ctx.cart.item_count(&guest).await.unwrap(), 0);
}

#[tokio::test]
async fn merge_sums_overlapping_lines_capped_at_stock() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Fralda Infantil M", dec!(49.90), None, 5).await;
    let customer_id = Uuid::new_v4();
    let owner = CartOwner::Customer(customer_id);

    ctx.cart.add_item(&owner, product.id, 4).await.unwrap();

    let guest = anonymous("sess-2");
    ctx.cart.add_item(&guest, product.id, 3).await.unwrap();

    let merged = ctx
        .cart
        .merge_anonymous_into_customer("sess-2", customer_id)
        .await
        .unwrap();
    assert_eq!(merged, 1);

    // 4 + 3 exceeds the 5 in stock: the merged quantity is silently capped.
    let cart = ctx.cart.get_cart(&owner).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
}

#[tokio::test]
async fn merge_with_unknown_token_is_a_noop() {
    let ctx = TestContext::new().await;
    let customer_id = Uuid::new_v4();

    let merged = ctx
        .cart
        .merge_anonymous_into_customer("never-seen", customer_id)
        .await
        .unwrap();
    assert_eq!(merged, 0);

    let owner = CartOwner::Customer(customer_id);
    assert_eq!(ctx.cart.item_count(&owner).await.unwrap(), 0);
}

#[tokio::test]
async fn merge_is_idempotent_once_the_token_is_drained() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("Termômetro Digital", dec!(19.90), None, 10).await;
    let customer_id = Uuid::new_v4();

    let guest = anonymous("sess-3");
    ctx.cart.add_item(&guest, product.id, 1).await.unwrap();

    assert_eq!(
        ctx.cart
            .merge_anonymous_into_customer("sess-3", customer_id)
            .await
            .unwrap(),
        1
    );
    // Firing the hook again finds nothing to merge and changes nothing.
    assert_eq!(
        ctx.cart
            .merge_anonymous_into_customer("sess-3", customer_id)
            .await
            .unwrap(),
        0
    );

    let owner = CartOwner::Customer(customer_id);
    assert_eq!(ctx.cart.item_count(&owner).await.unwrap(), 1);
}
