//! Account handlers.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{authorize, authorize_owner, CurrentUser};
use crate::api::AppState;
use crate::domain::{AccountResponse, OrderResponse, Role, UpdateAccount};
use crate::errors::AppResult;
use crate::types::{Cached, NoContent};

/// Partial account update; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl From<UpdateAccountRequest> for UpdateAccount {
    fn from(req: UpdateAccountRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
            role: req.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountOrdersResponse {
    pub account: AccountResponse,
    pub orders: Vec<OrderResponse>,
}

/// Create account routes (authentication applied by the router)
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route(
            "/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route("/:id/orders", get(get_account_orders))
}

/// Current account profile
pub async fn get_me(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> AppResult<Cached<AccountResponse>> {
    let user = authorize(user.as_ref(), Role::Member).into_result()?;

    let lookup = state.account_service.get_account(user.id).await?;
    Ok(Cached {
        source: lookup.source,
        body: lookup.value.into(),
    })
}

/// Get any account by id (admin only)
pub async fn get_account(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Cached<AccountResponse>> {
    authorize(user.as_ref(), Role::Admin).into_result()?;

    let lookup = state.account_service.get_account(id).await?;
    Ok(Cached {
        source: lookup.source,
        body: lookup.value.into(),
    })
}

/// Update an account (admin only)
pub async fn update_account(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<UpdateAccountRequest>,
) -> AppResult<Json<AccountResponse>> {
    authorize(user.as_ref(), Role::Admin).into_result()?;

    let account = state
        .account_service
        .update_account(id, payload.into())
        .await?;
    Ok(Json(account.into()))
}

/// Delete an account and its orders (admin only)
pub async fn delete_account(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<NoContent> {
    authorize(user.as_ref(), Role::Admin).into_result()?;

    state.account_service.delete_account(id).await?;
    Ok(NoContent)
}

/// Account with its orders (owner or admin)
pub async fn get_account_orders(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<AccountOrdersResponse>> {
    authorize_owner(user.as_ref(), id).into_result()?;

    let found = state.account_service.get_account_with_orders(id).await?;
    Ok(Json(AccountOrdersResponse {
        account: found.account.into(),
        orders: found.orders.into_iter().map(OrderResponse::from).collect(),
    }))
}
