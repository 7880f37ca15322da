use crate::taxonomy::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("invalid resource: {0}")]
    InvalidResource(String),
    #[error("invalid privilege: {0}")]
    InvalidPrivilege(String),
    #[error("invalid {kind} name: {reason}")]
    InvalidName { kind: &'static str, reason: String },
    #[error("entity version mismatch: expected {expected}, current {actual}")]
    VersionMismatch { expected: u64, actual: u64 },
}

impl AuthzError {
    /// Taxonomy kind reported to callers for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthzError::InvalidResource(_)
            | AuthzError::InvalidPrivilege(_)
            | AuthzError::InvalidName { .. } => ErrorKind::Validation,
            AuthzError::VersionMismatch { .. } => ErrorKind::Conflict,
        }
    }
}

pub type AuthzResult<T> = Result<T, AuthzError>;
