use crate::handlers::common::{created_response, map_service_error, success_response, CartIdentity};
use crate::services::{checkout::DeliveryInfo, payments::PaymentDetails};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quote", post(quote_shipping))
        .route("/", post(place_order))
}

/// Shipping sub-action: quote the fee for a postal code before the
/// delivery form is submitted. Persists nothing.
async fn quote_shipping(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = state
        .services
        .checkout
        .quote_shipping(&payload.postal_code)
        .map_err(map_service_error)?;

    Ok(success_response(quote))
}

/// Convert the customer's cart into an order
async fn place_order(
    State(state): State<Arc<AppState>>,
    identity: CartIdentity,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let customer_id = identity.customer_id().ok_or(ApiError::Unauthorized)?;

    let receipt = state
        .services
        .checkout
        .place_order(customer_id, payload.delivery, payload.payment)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(receipt))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub postal_code: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub delivery: DeliveryInfo,
    pub payment: PaymentDetails,
}
