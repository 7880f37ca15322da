//! Lattice access-control primitives shared by the control plane and its clients.
//!
//! # Purpose
//! Centralizes the pieces of the access-control model that have no I/O:
//! resource addressing and subtree containment, privilege tokens, the
//! entity-version compare-and-advance rule, and the error taxonomy.
//!
//! # How it fits
//! The control plane builds its role graph and grant store on these types and
//! answers failures with [`ErrorKind`] statuses; clients use [`translate`] to
//! turn transport failures back into the same kinds.
//!
//! # Key invariants
//! - [`Resource`] is a closed sum type; `path`/`contains` match on it exhaustively.
//! - A successful versioned mutation advances the version by exactly one.
//!
//! # Examples
//! ```rust
//! use lattice_authz::{Privilege, Resource};
//!
//! let scope = Resource::Catalog;
//! let target = Resource::view(["finance"], "monthly");
//! assert!(scope.contains(&target));
//! assert_eq!(Privilege::parse("SELECT").unwrap().as_str(), "SELECT");
//! ```

mod errors;
mod resource;
mod taxonomy;
mod types;
mod version;

pub use errors::{AuthzError, AuthzResult};
pub use resource::{Resource, ResourceKind};
pub use taxonomy::{DomainError, ErrorContext, ErrorKind, TransportFailure, translate};
pub use types::{MAX_NAME_LEN, Privilege, validate_name};
pub use version::{
    INITIAL_ENTITY_VERSION, VersionMismatch, check_entity_version, next_entity_version,
};
