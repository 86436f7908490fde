//! Order handlers.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};

use crate::api::middleware::{authorize, authorize_owner, CurrentUser};
use crate::api::AppState;
use crate::domain::{OrderResponse, Role};
use crate::errors::AppResult;

/// Create order routes (authentication applied by the router)
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/:id", get(get_order))
}

/// Get an order (owner or admin)
pub async fn get_order(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderResponse>> {
    let user = authorize(user.as_ref(), Role::Member).into_result()?;

    let order = state.order_service.get_order(id).await?;
    authorize_owner(Some(&user), order.account_id).into_result()?;

    Ok(Json(order.into()))
}
