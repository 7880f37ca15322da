//! Error taxonomy shared by the control plane and its clients.
//!
//! # Purpose
//! Every access-control operation fails with exactly one [`ErrorKind`]. The
//! control plane maps its internal failures onto these kinds (and their HTTP
//! statuses); clients map transport failures back with [`translate`] to get a
//! machine-checkable kind plus a message fit for a person.
//!
//! # Resolution order
//! 1. A specific message carried in the failure payload, unless it is empty or
//!    merely repeats the generic transport message.
//! 2. The default message for the status (see [`ErrorKind::default_message`]).
//! 3. The caller-supplied fallback, only when no status was received at all.
//!
//! # Examples
//! ```rust
//! use lattice_authz::{ErrorContext, ErrorKind, TransportFailure, translate};
//!
//! let ctx = ErrorContext::new("revoke", "grant");
//! let failure = TransportFailure::status(409, "Request failed with status code 409");
//! let err = translate(&failure, &ctx, None);
//! assert_eq!(err.kind, ErrorKind::Conflict);
//! assert!(err.message.starts_with("Entity version mismatch"));
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Unprocessable,
    ServerError,
    Unavailable,
    Unknown,
}

/// What the caller was doing when the failure happened; fills message templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Verb phrase, e.g. `"revoke"` or `"update"`.
    pub action: String,
    /// Object label, e.g. `"catalog role"`.
    pub resource: String,
}

impl ErrorContext {
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
        }
    }
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::Validation,
        ErrorKind::Unauthenticated,
        ErrorKind::Forbidden,
        ErrorKind::NotFound,
        ErrorKind::Conflict,
        ErrorKind::Unprocessable,
        ErrorKind::ServerError,
        ErrorKind::Unavailable,
        ErrorKind::Unknown,
    ];

    /// Classify a response status. Anything outside the table is `Unknown`.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::Validation,
            401 => ErrorKind::Unauthenticated,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            422 => ErrorKind::Unprocessable,
            500 => ErrorKind::ServerError,
            503 => ErrorKind::Unavailable,
            _ => ErrorKind::Unknown,
        }
    }

    /// Status the control plane answers with for this kind.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Unprocessable => 422,
            ErrorKind::ServerError | ErrorKind::Unknown => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    /// Stable machine-readable code used in error bodies.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Unauthenticated => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unprocessable => "unprocessable",
            ErrorKind::ServerError => "internal",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Unknown => "unknown",
        }
    }

    pub fn default_message(self, ctx: &ErrorContext) -> String {
        match self {
            ErrorKind::Validation => {
                "Invalid request. Please check your input and try again.".to_string()
            }
            ErrorKind::Unauthenticated => {
                "You are not authenticated. Please log in again.".to_string()
            }
            ErrorKind::Forbidden => format!(
                "You don't have permission to {} on this {}.",
                ctx.action, ctx.resource
            ),
            ErrorKind::NotFound => format!("The {} was not found.", ctx.resource),
            ErrorKind::Conflict => "Entity version mismatch. The resource may have been modified. Please refresh and try again.".to_string(),
            ErrorKind::Unprocessable => {
                "The request is valid but cannot be processed. Please check your input."
                    .to_string()
            }
            ErrorKind::ServerError => {
                "An internal server error occurred. Please try again later.".to_string()
            }
            ErrorKind::Unavailable => {
                "The service is temporarily unavailable. Please try again later.".to_string()
            }
            ErrorKind::Unknown => format!(
                "An error occurred while trying to {} the {}.",
                ctx.action, ctx.resource
            ),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Failure as reported by the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportFailure {
    /// Response status; `None` when no response arrived (connection error, timeout).
    pub status: Option<u16>,
    /// Message extracted from the structured error body, if any.
    pub message: Option<String>,
    /// Generic message produced by the transport itself.
    pub transport_message: String,
}

impl TransportFailure {
    pub fn status(status: u16, transport_message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: None,
            transport_message: transport_message.into(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn no_response(transport_message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: None,
            transport_message: transport_message.into(),
        }
    }

    fn specific_message(&self) -> Option<&str> {
        let message = self.message.as_deref()?.trim();
        if message.is_empty() || message == self.transport_message.trim() {
            return None;
        }
        Some(message)
    }
}

/// Classified failure surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct DomainError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DomainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Classify a transport failure and pick the message to show.
pub fn translate(
    failure: &TransportFailure,
    ctx: &ErrorContext,
    fallback: Option<&str>,
) -> DomainError {
    let kind = failure
        .status
        .map(ErrorKind::from_status)
        .unwrap_or(ErrorKind::Unknown);
    if let Some(message) = failure.specific_message() {
        return DomainError::new(kind, message);
    }
    let message = match (failure.status, fallback) {
        (None, Some(fallback)) => fallback.to_string(),
        _ => kind.default_message(ctx),
    };
    DomainError::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ErrorContext {
        ErrorContext::new("revoke", "grant")
    }

    #[test]
    fn status_table_maps_to_kind_and_default_message() {
        let cases = [
            (
                400,
                ErrorKind::Validation,
                "Invalid request. Please check your input and try again.",
            ),
            (
                401,
                ErrorKind::Unauthenticated,
                "You are not authenticated. Please log in again.",
            ),
            (
                403,
                ErrorKind::Forbidden,
                "You don't have permission to revoke on this grant.",
            ),
            (404, ErrorKind::NotFound, "The grant was not found."),
            (
                409,
                ErrorKind::Conflict,
                "Entity version mismatch. The resource may have been modified. Please refresh and try again.",
            ),
            (
                422,
                ErrorKind::Unprocessable,
                "The request is valid but cannot be processed. Please check your input.",
            ),
            (
                500,
                ErrorKind::ServerError,
                "An internal server error occurred. Please try again later.",
            ),
            (
                503,
                ErrorKind::Unavailable,
                "The service is temporarily unavailable. Please try again later.",
            ),
            (
                418,
                ErrorKind::Unknown,
                "An error occurred while trying to revoke the grant.",
            ),
        ];
        for (status, kind, message) in cases {
            let failure = TransportFailure::status(status, format!("status {status}"));
            let err = translate(&failure, &ctx(), Some("fallback"));
            assert_eq!(err.kind, kind, "status {status}");
            assert_eq!(err.message, message, "status {status}");
        }
    }

    #[test]
    fn specific_payload_message_wins() {
        let failure = TransportFailure::status(404, "Request failed with status code 404")
            .with_message("catalog role analysts not found in catalog sales");
        let err = translate(&failure, &ctx(), None);
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "catalog role analysts not found in catalog sales");
    }

    #[test]
    fn payload_repeating_transport_message_is_ignored() {
        let failure = TransportFailure::status(409, "Request failed with status code 409")
            .with_message("Request failed with status code 409");
        let err = translate(&failure, &ctx(), None);
        assert!(err.message.starts_with("Entity version mismatch"));

        let blank = TransportFailure::status(400, "bad").with_message("   ");
        assert_eq!(
            translate(&blank, &ctx(), None).message,
            ErrorKind::Validation.default_message(&ctx())
        );
    }

    #[test]
    fn missing_status_uses_fallback_then_unknown_template() {
        let failure = TransportFailure::no_response("timeout of 30000ms exceeded");
        let err = translate(&failure, &ctx(), Some("Could not reach the server."));
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "Could not reach the server.");

        let err = translate(&failure, &ctx(), None);
        assert_eq!(
            err.message,
            "An error occurred while trying to revoke the grant."
        );
    }

    #[test]
    fn kinds_round_trip_through_their_status() {
        for kind in ErrorKind::ALL {
            if kind == ErrorKind::Unknown {
                assert_eq!(ErrorKind::from_status(kind.status()), ErrorKind::ServerError);
            } else {
                assert_eq!(ErrorKind::from_status(kind.status()), kind);
            }
            assert!(!kind.code().is_empty());
        }
    }

    #[test]
    fn domain_error_display_includes_code() {
        let err = DomainError::new(ErrorKind::Conflict, "stale");
        assert_eq!(err.to_string(), "conflict: stale");
    }
}
