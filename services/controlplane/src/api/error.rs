//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Renders every failure of the management API as an [`ErrorResponse`] whose
//! `code` and HTTP status come from the shared [`ErrorKind`] taxonomy, so
//! clients can classify responses with `lattice_authz::translate`.
//!
//! # Key invariants and assumptions
//! - `status == kind.status()` and `body.code == kind.code()` for every error.
//! - Domain failures (not found, conflict, validation) carry the store's
//!   message; unexpected failures are logged and answered generically.
//!
//! # Security considerations
//! - Internal errors log details server-side but return generic messages.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lattice_authz::ErrorKind;

/// Structured API error returned by handlers.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use lattice_authz::ErrorKind;
/// use lattice_controlplane::api::error::api_error;
///
/// let err = api_error(ErrorKind::NotFound, "principal alice");
/// assert_eq!(err.status.as_u16(), 404);
/// assert_eq!(err.body.code, "not_found");
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Build an error of the given kind with a caller-facing message.
pub fn api_error(kind: ErrorKind, message: &str) -> ApiError {
    ApiError {
        status: StatusCode::from_u16(kind.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        body: ErrorResponse {
            code: kind.code().to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

pub fn api_validation_error(message: &str) -> ApiError {
    api_error(ErrorKind::Validation, message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    api_error(ErrorKind::Unauthenticated, message)
}

pub fn api_forbidden(message: &str) -> ApiError {
    api_error(ErrorKind::Forbidden, message)
}

/// Build a 500 from a store error, logging the details.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "controlplane storage error");
    api_error(ErrorKind::ServerError, message)
}

/// Build a 503 from a failed dependency probe, logging the details.
pub fn api_unavailable(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "controlplane storage unavailable");
    api_error(ErrorKind::Unavailable, message)
}

// Malformed bodies and query strings are caller input errors, whatever
// status axum would have picked for them.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        api_validation_error(&rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        api_validation_error(&rejection.body_text())
    }
}

/// Map a store failure onto the taxonomy.
///
/// `context` names the operation (e.g. `"failed to revoke grant"`) and is only
/// shown for unexpected failures, whose details stay in the log.
pub fn store_error(context: &str, err: StoreError) -> ApiError {
    match &err {
        StoreError::Unexpected(_) => api_internal(context, &err),
        _ => api_error(err.kind(), &err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_authz::AuthzError;

    #[test]
    fn helpers_follow_the_taxonomy() {
        let cases = [
            (api_validation_error("bad"), 400, "validation_error"),
            (api_unauthorized("nope"), 401, "unauthorized"),
            (api_forbidden("nope"), 403, "forbidden"),
            (api_error(ErrorKind::Unprocessable, "no"), 422, "unprocessable"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status.as_u16(), status);
            assert_eq!(err.body.code, code);
            assert!(err.body.request_id.is_none());
        }
    }

    #[test]
    fn store_errors_keep_domain_messages() {
        let err = store_error(
            "failed to load principal",
            StoreError::NotFound("principal alice".into()),
        );
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body.message, "not found: principal alice");

        let err = store_error(
            "failed to grant",
            StoreError::VersionConflict {
                entity: "catalog_role",
                name: "prod/analysts".into(),
                expected: 1,
                actual: 2,
            },
        );
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.body.code, "conflict");
        assert!(err.body.message.contains("expected 1, current 2"));

        let err = store_error(
            "failed to grant",
            StoreError::Invalid(AuthzError::InvalidPrivilege("empty".into())),
        );
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unexpected_store_errors_are_generic() {
        let err = store_error(
            "failed to revoke grant",
            StoreError::Unexpected(anyhow::anyhow!("connection reset by peer")),
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.code, "internal");
        assert_eq!(err.body.message, "failed to revoke grant");

        let err = api_unavailable(
            "storage unavailable",
            &StoreError::Unexpected(anyhow::anyhow!("pool timed out")),
        );
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.body.code, "unavailable");
    }
}
