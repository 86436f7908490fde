use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::infra::ReadSource;

/// Header telling clients whether a read was served from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Created response helper (common pattern for POST endpoints)
pub struct Created<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// No content response helper (common pattern for DELETE endpoints)
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

/// JSON body tagged with `x-cache: HIT|MISS`.
pub struct Cached<T: Serialize> {
    pub body: T,
    pub source: ReadSource,
}

impl<T: Serialize> IntoResponse for Cached<T> {
    fn into_response(self) -> Response {
        let tag = if self.source.is_hit() { "HIT" } else { "MISS" };
        ([(X_CACHE, HeaderValue::from_static(tag))], Json(self.body)).into_response()
    }
}
