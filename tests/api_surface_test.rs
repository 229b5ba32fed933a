//! Request-level tests for the HTTP surface: identity headers, error
//! mapping, and the happy-path storefront flow over the router.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
};
use common::TestContext;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const CUSTOMER_ID_HEADER: &str = "x-customer-id";
const SESSION_TOKEN_HEADER: &str = "x-session-token";

async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_database_status() {
    let ctx = TestContext::new().await;
    let response = ctx
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn anonymous_cart_request_mints_a_session_token() {
    let ctx = TestContext::new().await;
    let response = ctx
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/carts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let token = response
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .expect("minted token echoed back")
        .to_str()
        .unwrap()
        .to_string();
    assert!(!token.is_empty());

    let body = response_json(response).await;
    assert_eq!(body["total"], "0");
    assert_eq!(body["item_count"], 0);
}

#[tokio::test]
async fn add_to_cart_validates_payload_and_product() {
    let ctx = TestContext::new().await;
    let router = ctx.router();

    // Unknown product -> 404 with the standard error body.
    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/carts/items",
            json!({ "product_id": Uuid::new_v4(), "quantity": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");

    // Zero quantity is rejected by request validation.
    let product = ctx.seed_product("Dipirona 500mg", dec!(12.90), None, 10).await;
    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/carts/items",
            json!({ "product_id": product.id, "quantity": 0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_requires_an_authenticated_customer() {
    let ctx = TestContext::new().await;
    let response = ctx
        .router()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/checkout",
            json!({
                "delivery": {
                    "address": "Av. Paulista, 1000",
                    "city": "São Paulo",
                    "state": "SP",
                    "postal_code": "01310-100",
                    "phone": "11999990000"
                },
                "payment": { "method": "pix" }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn shipping_quote_endpoint_maps_validation_errors() {
    let ctx = TestContext::new().await;
    let router = ctx.router();

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/checkout/quote",
            json!({ "postal_code": "01310-100" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["fee"], "14.90");
    assert_eq!(body["postal_code"], "01310100");

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/checkout/quote",
            json!({ "postal_code": "1234" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn storefront_flow_over_http_places_an_order() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let product = ctx.seed_product("Kit Vitaminas", dec!(50.00), None, 10).await;
    let customer_id = Uuid::new_v4();

    // Add to cart as the authenticated customer.
    let mut request = json_request(
        Method::POST,
        "/api/v1/carts/items",
        json!({ "product_id": product.id, "quantity": 2 }),
    );
    request
        .headers_mut()
        .insert(CUSTOMER_ID_HEADER, customer_id.to_string().parse().unwrap());
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cart = response_json(response).await;
    assert_eq!(cart["item_count"], 2);

    // Place the order with an approved card.
    let mut request = json_request(
        Method::POST,
        "/api/v1/checkout",
        json!({
            "delivery": {
                "address": "Av. Paulista, 1000",
                "city": "São Paulo",
                "state": "SP",
                "postal_code": "01310-100",
                "phone": "11999990000"
            },
            "payment": {
                "method": "credit_card",
                "card_number": "4111111111111112",
                "cardholder_name": "Maria Souza",
                "expiry": "12/28",
                "cvv": "123"
            }
        }),
    );
    request
        .headers_mut()
        .insert(CUSTOMER_ID_HEADER, customer_id.to_string().parse().unwrap());
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let receipt = response_json(response).await;
    assert_eq!(receipt["order"]["status"], "processing");
    assert_eq!(receipt["payment"]["status"], "authorized");

    // The order shows up in the customer's history.
    let mut request = Request::builder()
        .uri("/api/v1/orders")
        .body(Body::empty())
        .unwrap();
    request
        .headers_mut()
        .insert(CUSTOMER_ID_HEADER, customer_id.to_string().parse().unwrap());
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = response_json(response).await;
    assert_eq!(page["total"], 1);
}
