//! JWT authentication middleware and role checks.
//!
//! The middleware rejects requests without a valid bearer token before any
//! handler runs. Handlers then call [`authorize`] (or [`authorize_owner`])
//! before touching a service, so a denied request never reaches the store.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::domain::Role;
use crate::errors::{AppError, AppResult};

/// Authenticated account extracted from JWT token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    /// Check if user has admin role.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}

/// JWT authentication middleware.
///
/// Extracts and validates the JWT token from the Authorization header,
/// then injects the CurrentUser into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .ok_or(AppError::Unauthenticated)?;

    let claims = state.auth_service.verify_token(token)?;

    let current_user = CurrentUser {
        id: claims.sub,
        role: claims.role(),
        name: claims.name,
        email: claims.email,
    };
    tracing::debug!(account_id = current_user.id, role = %current_user.role, "Authenticated request");

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Outcome of a role check.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub allowed: bool,
    pub claims: Option<CurrentUser>,
}

impl AuthResult {
    /// No claims is `Unauthenticated`, a denied role is `Forbidden`.
    pub fn into_result(self) -> AppResult<CurrentUser> {
        match self.claims {
            None => Err(AppError::Unauthenticated),
            Some(_) if !self.allowed => Err(AppError::Forbidden),
            Some(user) => Ok(user),
        }
    }
}

/// Check that the caller holds `required` (admin satisfies every role).
pub fn authorize(user: Option<&CurrentUser>, required: Role) -> AuthResult {
    AuthResult {
        allowed: user.is_some_and(|u| u.role.satisfies(required)),
        claims: user.cloned(),
    }
}

/// Check that the caller owns `owner_id` or is an admin.
pub fn authorize_owner(user: Option<&CurrentUser>, owner_id: i64) -> AuthResult {
    AuthResult {
        allowed: user.is_some_and(|u| u.is_admin() || u.id == owner_id),
        claims: user.cloned(),
    }
}
