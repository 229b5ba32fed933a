use crate::entities::OrderStatus;
use crate::handlers::common::{
    map_service_error, success_response, CartIdentity, PaginationParams,
};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for order history and administration
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders))
        .route("/{id}", get(get_order))
        .route("/{id}/status", put(update_order_status))
}

/// List the customer's orders, newest first
async fn list_orders(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let customer_id = identity.customer_id().ok_or(ApiError::Unauthorized)?;

    let page = state
        .services
        .orders
        .list_orders(customer_id, pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(page))
}

/// Order confirmation / history detail view
async fn get_order(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer_id = identity.customer_id().ok_or(ApiError::Unauthorized)?;

    let detail = state
        .services
        .orders
        .get_order(customer_id, order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(detail))
}

/// Administrative status transition (fulfillment surface)
async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_status(order_id, payload.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}
