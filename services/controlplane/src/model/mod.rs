//! Control-plane data model module.
//!
//! # Purpose
//! Re-exports the principal, role, and grant records shared by the API and
//! store layers.
mod catalog_role;
mod grant;
mod principal;
mod principal_role;

pub use catalog_role::{CatalogRole, CatalogRoleKey};
pub use grant::{Grant, GrantEntry};
pub(crate) use grant::sort_grants;
pub use principal::Principal;
pub use principal_role::PrincipalRole;

use std::collections::BTreeMap;

/// Free-form string properties carried by every versioned entity.
pub type Properties = BTreeMap<String, String>;

/// Property replacement for a versioned entity.
///
/// `expected_version` is the caller's view of the entity; `None` skips the
/// comparison (last writer wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityUpdate {
    pub properties: Properties,
    pub expected_version: Option<u64>,
}
