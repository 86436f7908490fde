//! Authentication handlers.

use axum::{extract::State, response::Json, routing::post, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::domain::{AccountResponse, LineItem, NewAccount, NewOrder, OrderResponse, OrderStatus};
use crate::errors::AppResult;
use crate::services::TokenResponse;
use crate::types::Created;

/// Account registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl From<RegisterRequest> for NewAccount {
    fn from(req: RegisterRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
        }
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
}

/// Line item of an order request
#[derive(Debug, Deserialize, Validate)]
pub struct LineItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// First order placed together with the registration
#[derive(Debug, Deserialize, Validate)]
pub struct OrderRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<LineItemRequest>,
}

impl From<OrderRequest> for NewOrder {
    fn from(req: OrderRequest) -> Self {
        Self {
            amount: req.amount,
            status: req.status.unwrap_or_default(),
            items: req
                .items
                .into_iter()
                .map(|item| LineItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        }
    }
}

/// Register an account and its first order atomically
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterWithOrderRequest {
    #[validate(nested)]
    pub account: RegisterRequest,
    #[validate(nested)]
    pub order: OrderRequest,
}

#[derive(Debug, Serialize)]
pub struct RegisterWithOrderResponse {
    pub account: AccountResponse,
    pub order: OrderResponse,
}

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/register-with-order", post(register_with_order))
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Created<AccountResponse>> {
    let account = state.auth_service.register(payload.into()).await?;

    Ok(Created(AccountResponse::from(account)))
}

/// Login and get JWT token
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = state
        .auth_service
        .login(payload.email, payload.password)
        .await?;

    Ok(Json(token))
}

/// Register an account together with its first order
pub async fn register_with_order(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterWithOrderRequest>,
) -> AppResult<Created<RegisterWithOrderResponse>> {
    let registration = state
        .account_service
        .register_with_order(payload.account.into(), payload.order.into())
        .await?;

    Ok(Created(RegisterWithOrderResponse {
        account: registration.account.into(),
        order: registration.order.into(),
    }))
}
