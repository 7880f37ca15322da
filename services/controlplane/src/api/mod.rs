//! Management HTTP API.
//!
//! # Purpose
//! Exposes handler modules for principals, roles and grants plus the request
//! guards shared by all of them: the optional static admin token and the
//! `require_entity_version` policy.
pub mod catalog_roles;
pub mod error;
pub mod grants;
pub mod openapi;
pub mod principal_roles;
pub mod principals;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_forbidden, api_unauthorized, api_validation_error};
use crate::app::AppState;
use axum::extract::{FromRequest, FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

/// JSON body extractor whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections render as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Reject requests without the configured admin bearer token.
///
/// A missing or malformed `Authorization` header is 401; a different token is 403.
pub(crate) async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.admin_token.as_deref() {
        let bearer =
            extract_bearer(request.headers()).ok_or_else(|| api_unauthorized("missing bearer token"))?;
        if bearer != expected {
            tracing::warn!(path = %request.uri().path(), "admin token rejected");
            return Err(api_forbidden("admin token not accepted"));
        }
    }
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim).filter(|token| !token.is_empty())
}

/// Apply the entity-version policy to a mutation's `currentEntityVersion`.
pub(crate) fn expected_version(
    state: &AppState,
    current_entity_version: Option<u64>,
) -> Result<Option<u64>, ApiError> {
    if state.require_entity_version && current_entity_version.is_none() {
        return Err(api_validation_error("currentEntityVersion is required"));
    }
    Ok(current_entity_version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_is_extracted_and_trimmed() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer(&headers).is_none());

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc"),
        );
        assert!(extract_bearer(&headers).is_none());

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert!(extract_bearer(&headers).is_none());

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer s3cret "),
        );
        assert_eq!(extract_bearer(&headers), Some("s3cret"));
    }
}
