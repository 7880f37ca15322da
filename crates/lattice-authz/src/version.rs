//! Optimistic-concurrency primitive for versioned entities.
//!
//! # Purpose
//! Every principal, principal role, and catalog role carries an
//! `entity_version`. A mutation may name the version it was computed against;
//! the store compares it with the stored version and either advances the
//! version by one or rejects the mutation.
//!
//! # Key invariants
//! - Entities start at [`INITIAL_ENTITY_VERSION`].
//! - A successful mutation produces exactly `current + 1`.
//! - `expected = None` is the relaxed last-writer-wins path: no comparison.
//! - Callers must run [`check_entity_version`] inside the same critical section
//!   (lock or transaction) that applies the mutation; the check alone is not atomic.
use crate::errors::AuthzError;
use thiserror::Error;

pub const INITIAL_ENTITY_VERSION: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("entity version mismatch: expected {expected}, current {actual}")]
pub struct VersionMismatch {
    pub expected: u64,
    pub actual: u64,
}

impl From<VersionMismatch> for AuthzError {
    fn from(value: VersionMismatch) -> Self {
        AuthzError::VersionMismatch {
            expected: value.expected,
            actual: value.actual,
        }
    }
}

/// Compare the caller's view of an entity with the stored version.
///
/// Returns the version the entity must carry after the mutation is applied.
///
/// # Example
/// ```rust
/// use lattice_authz::check_entity_version;
///
/// assert_eq!(check_entity_version(4, Some(4)), Ok(5));
/// assert_eq!(check_entity_version(4, None), Ok(5));
/// assert!(check_entity_version(4, Some(3)).is_err());
/// ```
pub fn check_entity_version(current: u64, expected: Option<u64>) -> Result<u64, VersionMismatch> {
    match expected {
        Some(expected) if expected != current => Err(VersionMismatch {
            expected,
            actual: current,
        }),
        _ => Ok(current + 1),
    }
}

/// Like [`check_entity_version`] for mutations that may turn out to be no-ops.
///
/// The comparison still applies, but the version only advances when `changed` is true.
pub fn next_entity_version(
    current: u64,
    expected: Option<u64>,
    changed: bool,
) -> Result<u64, VersionMismatch> {
    let next = check_entity_version(current, expected)?;
    Ok(if changed { next } else { current })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_version_advances_by_one() {
        assert_eq!(
            check_entity_version(INITIAL_ENTITY_VERSION, Some(INITIAL_ENTITY_VERSION)),
            Ok(INITIAL_ENTITY_VERSION + 1)
        );
    }

    #[test]
    fn stale_version_is_rejected() {
        let err = check_entity_version(7, Some(6)).expect_err("stale");
        assert_eq!(
            err,
            VersionMismatch {
                expected: 6,
                actual: 7
            }
        );
        let authz: AuthzError = err.into();
        assert_eq!(authz.kind(), crate::ErrorKind::Conflict);
    }

    #[test]
    fn omitted_version_is_last_writer_wins() {
        assert_eq!(check_entity_version(9, None), Ok(10));
    }

    #[test]
    fn second_use_of_same_version_conflicts() {
        let v = 3;
        let stored = check_entity_version(v, Some(v)).expect("first");
        assert_eq!(stored, v + 1);
        assert!(check_entity_version(stored, Some(v)).is_err());
    }

    #[test]
    fn no_op_keeps_version_but_still_checks() {
        assert_eq!(next_entity_version(2, Some(2), false), Ok(2));
        assert_eq!(next_entity_version(2, None, true), Ok(3));
        assert!(next_entity_version(2, Some(1), false).is_err());
    }
}
