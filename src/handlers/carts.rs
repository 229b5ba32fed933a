use crate::handlers::common::{
    map_service_error, no_content_response, success_response, validate_input, CartIdentity,
};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/summary", get(cart_summary))
        .route("/items", post(add_to_cart))
        .route("/items/{product_id}", put(update_cart_item))
        .route("/items/{product_id}", delete(remove_cart_item))
        .route("/clear", post(clear_cart))
        .route("/merge", post(merge_cart))
}

/// Get the current identity's cart with items and totals
async fn get_cart(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(&identity.owner)
        .await
        .map_err(map_service_error)?;

    Ok(identity.decorate(success_response(cart)))
}

/// Lightweight totals for the cart badge
async fn cart_summary(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(&identity.owner)
        .await
        .map_err(map_service_error)?;

    Ok(identity.decorate(success_response(json!({
        "total": cart.total,
        "item_count": cart.item_count,
    }))))
}

/// Add a product to the cart
async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .cart
        .add_item(&identity.owner, payload.product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    let cart = state
        .services
        .cart
        .get_cart(&identity.owner)
        .await
        .map_err(map_service_error)?;

    Ok(identity.decorate(success_response(cart)))
}

/// Update the quantity of a cart line
async fn update_cart_item(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .cart
        .update_item_quantity(&identity.owner, product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    let cart = state
        .services
        .cart
        .get_cart(&identity.owner)
        .await
        .map_err(map_service_error)?;

    Ok(identity.decorate(success_response(cart)))
}

/// Remove a product from the cart
async fn remove_cart_item(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .cart
        .remove_item(&identity.owner, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(identity.decorate(no_content_response()))
}

/// Clear all items from the cart
async fn clear_cart(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .services
        .cart
        .clear_cart(&identity.owner)
        .await
        .map_err(map_service_error)?;

    Ok(identity.decorate(success_response(json!({ "items_removed": removed }))))
}

/// Post-authentication hook: fold an anonymous cart into the customer's.
/// The login flow calls this once with the pre-login session token.
async fn merge_cart(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
    Json(payload): Json<MergeCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let customer_id = identity.customer_id().ok_or(ApiError::Unauthorized)?;

    let merged = state
        .services
        .cart
        .merge_anonymous_into_customer(&payload.session_token, customer_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "items_merged": merged })))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct MergeCartRequest {
    pub session_token: String,
}
