//! Application route configuration.

use axum::{extract::State, http::StatusCode, middleware, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::handlers::{account_routes, auth_routes, order_routes};
use super::middleware::auth_middleware;
use super::AppState;

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // Public authentication routes
        .nest("/auth", auth_routes())
        // Protected routes (require JWT)
        .nest(
            "/accounts",
            account_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/orders",
            order_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Account & order service"
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    services: ServiceHealth,
}

/// Individual service health status
#[derive(Serialize)]
struct ServiceHealth {
    database: ServiceStatus,
    cache: ServiceStatus,
}

/// Service status
#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ServiceStatus {
    fn from_probe<E: std::fmt::Display>(result: Option<Result<(), E>>) -> Self {
        match result {
            None => Self {
                status: "disabled",
                error: None,
            },
            Some(Ok(())) => Self {
                status: "healthy",
                error: None,
            },
            Some(Err(e)) => Self {
                status: "unhealthy",
                error: Some(e.to_string()),
            },
        }
    }
}

/// Health check endpoint probing the database and the cache.
///
/// The cache is optional, so only an unreachable database makes the
/// service unhealthy; a failing cache reports `degraded`.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_probe = match &state.database {
        Some(db) => Some(db.ping().await),
        None => None,
    };
    let cache_probe = match &state.cache {
        Some(cache) => Some(cache.ping().await),
        None => None,
    };

    let database = ServiceStatus::from_probe(db_probe);
    let cache = ServiceStatus::from_probe(cache_probe);

    let (status, code) = match (database.status, cache.status) {
        ("unhealthy", _) => ("unhealthy", StatusCode::SERVICE_UNAVAILABLE),
        (_, "unhealthy") => ("degraded", StatusCode::OK),
        _ => ("healthy", StatusCode::OK),
    };

    let response = HealthResponse {
        status,
        services: ServiceHealth { database, cache },
    };

    (code, Json(response))
}
