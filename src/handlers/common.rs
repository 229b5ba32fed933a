use crate::errors::{ApiError, ServiceError};
use crate::services::cart::CartOwner;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Resolved cart identity for the current request.
///
/// The upstream auth layer supplies `X-Customer-Id` for logged-in shoppers;
/// anonymous shoppers are keyed by `X-Session-Token`. When neither header is
/// present a session token is minted lazily and echoed back so the client
/// can keep using it.
#[derive(Debug, Clone)]
pub struct CartIdentity {
    pub owner: CartOwner,
    /// Set when this request minted a fresh anonymous token.
    pub minted_token: Option<String>,
}

impl CartIdentity {
    /// The customer id, when the request is authenticated.
    pub fn customer_id(&self) -> Option<Uuid> {
        match self.owner {
            CartOwner::Customer(id) => Some(id),
            CartOwner::Anonymous(_) => None,
        }
    }

    /// Attaches the minted session token (if any) to an outgoing response.
    pub fn decorate(&self, mut response: Response) -> Response {
        if let Some(token) = &self.minted_token {
            if let Ok(value) = HeaderValue::from_str(token) {
                response.headers_mut().insert(SESSION_TOKEN_HEADER, value);
            }
        }
        response
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CartIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(raw) = parts.headers.get(CUSTOMER_ID_HEADER) {
            let raw = raw
                .to_str()
                .map_err(|_| ApiError::BadRequest("invalid customer id header".to_string()))?;
            let customer_id = Uuid::parse_str(raw)
                .map_err(|_| ApiError::BadRequest("invalid customer id header".to_string()))?;
            return Ok(CartIdentity {
                owner: CartOwner::Customer(customer_id),
                minted_token: None,
            });
        }

        if let Some(raw) = parts.headers.get(SESSION_TOKEN_HEADER) {
            let token = raw
                .to_str()
                .map_err(|_| ApiError::BadRequest("invalid session token header".to_string()))?
                .trim()
                .to_string();
            if !token.is_empty() {
                return Ok(CartIdentity {
                    owner: CartOwner::Anonymous(token),
                    minted_token: None,
                });
            }
        }

        let token = Uuid::new_v4().simple().to_string();
        Ok(CartIdentity {
            owner: CartOwner::Anonymous(token.clone()),
            minted_token: Some(token),
        })
    }
}

/// Pagination parameters for list operations
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}
