//! Storage traits and shared store helpers.
//!
//! # Purpose
//! Defines the role-graph and grant-store contracts implemented by every
//! backend, the store error type, and the version-check helper both backends
//! run inside their critical sections.
//!
//! # Key invariants
//! - Every mutation of a versioned entity goes through [`check_version`] while
//!   the backend holds the entity exclusively (write lock or row lock).
//! - A failed mutation leaves no partial state behind.
use crate::model::{
    CatalogRole, CatalogRoleKey, EntityUpdate, Grant, GrantEntry, Principal, PrincipalRole,
};
use async_trait::async_trait;
use lattice_authz::{AuthzError, ErrorKind, Resource, next_entity_version};
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("{entity} {name}: entity version mismatch (expected {expected}, current {actual})")]
    VersionConflict {
        entity: &'static str,
        name: String,
        expected: u64,
        actual: u64,
    },
    #[error(transparent)]
    Invalid(#[from] AuthzError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl StoreError {
    /// Classify the failure for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::AlreadyExists(_) | StoreError::VersionConflict { .. } => {
                ErrorKind::Conflict
            }
            StoreError::Invalid(err) => err.kind(),
            StoreError::Unexpected(_) => ErrorKind::ServerError,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        StoreError::Unexpected(value.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(value.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Compare `expected` with the stored version and return the version to persist.
///
/// No-op mutations (`changed == false`) are still checked but keep the version.
pub(crate) fn check_version(
    entity: &'static str,
    name: &str,
    current: u64,
    expected: Option<u64>,
    changed: bool,
) -> StoreResult<u64> {
    next_entity_version(current, expected, changed).map_err(|mismatch| {
        metrics::counter!("lattice_version_conflicts_total", "entity" => entity).increment(1);
        tracing::warn!(
            entity,
            name,
            expected = mismatch.expected,
            actual = mismatch.actual,
            "entity version conflict"
        );
        StoreError::VersionConflict {
            entity,
            name: name.to_string(),
            expected: mismatch.expected,
            actual: mismatch.actual,
        }
    })
}

/// Move the `lattice_grants_total` gauge by the tuples a committed mutation
/// added or removed.
pub(crate) fn record_grant_delta(added: usize, removed: usize) {
    let gauge = metrics::gauge!("lattice_grants_total");
    if added > 0 {
        gauge.increment(added as f64);
    }
    if removed > 0 {
        gauge.decrement(removed as f64);
    }
}

/// Principals, principal roles, catalog roles and the edges between them.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn create_principal(&self, principal: Principal) -> StoreResult<Principal>;
    async fn get_principal(&self, name: &str) -> StoreResult<Principal>;
    async fn list_principals(&self) -> StoreResult<Vec<Principal>>;
    async fn update_principal(&self, name: &str, update: EntityUpdate) -> StoreResult<Principal>;
    async fn delete_principal(&self, name: &str, expected: Option<u64>) -> StoreResult<()>;

    async fn create_principal_role(&self, role: PrincipalRole) -> StoreResult<PrincipalRole>;
    async fn get_principal_role(&self, name: &str) -> StoreResult<PrincipalRole>;
    async fn list_principal_roles(&self) -> StoreResult<Vec<PrincipalRole>>;
    async fn update_principal_role(
        &self,
        name: &str,
        update: EntityUpdate,
    ) -> StoreResult<PrincipalRole>;
    async fn delete_principal_role(&self, name: &str, expected: Option<u64>) -> StoreResult<()>;

    async fn create_catalog_role(&self, role: CatalogRole) -> StoreResult<CatalogRole>;
    async fn get_catalog_role(&self, key: &CatalogRoleKey) -> StoreResult<CatalogRole>;
    async fn list_catalog_roles(&self, catalog_name: &str) -> StoreResult<Vec<CatalogRole>>;
    async fn update_catalog_role(
        &self,
        key: &CatalogRoleKey,
        update: EntityUpdate,
    ) -> StoreResult<CatalogRole>;
    async fn delete_catalog_role(
        &self,
        key: &CatalogRoleKey,
        expected: Option<u64>,
    ) -> StoreResult<()>;

    /// Idempotent; bumps the principal's version when the edge is new.
    async fn assign_principal_role(
        &self,
        principal: &str,
        principal_role: &str,
        expected: Option<u64>,
    ) -> StoreResult<Principal>;
    async fn revoke_principal_role(
        &self,
        principal: &str,
        principal_role: &str,
        expected: Option<u64>,
    ) -> StoreResult<Principal>;
    /// Idempotent; bumps the principal role's version when the edge is new.
    async fn bind_catalog_role(
        &self,
        principal_role: &str,
        key: &CatalogRoleKey,
        expected: Option<u64>,
    ) -> StoreResult<PrincipalRole>;
    async fn unbind_catalog_role(
        &self,
        principal_role: &str,
        key: &CatalogRoleKey,
        expected: Option<u64>,
    ) -> StoreResult<PrincipalRole>;

    async fn principal_roles_for_principal(
        &self,
        principal: &str,
    ) -> StoreResult<Vec<PrincipalRole>>;
    async fn principals_for_principal_role(
        &self,
        principal_role: &str,
    ) -> StoreResult<Vec<Principal>>;
    async fn catalog_roles_for_principal_role(
        &self,
        principal_role: &str,
        catalog_name: Option<&str>,
    ) -> StoreResult<Vec<CatalogRole>>;
    async fn principal_roles_for_catalog_role(
        &self,
        key: &CatalogRoleKey,
    ) -> StoreResult<Vec<PrincipalRole>>;
    /// Catalog roles reachable from the principal, de-duplicated and sorted by key.
    async fn effective_catalog_roles(&self, principal: &str) -> StoreResult<Vec<CatalogRole>>;
}

/// Grant tuples owned by catalog roles.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Insert the tuple if absent. Re-granting is a successful no-op.
    async fn grant(
        &self,
        key: &CatalogRoleKey,
        entry: GrantEntry,
        expected: Option<u64>,
    ) -> StoreResult<Grant>;
    /// Remove the exact tuple and, with `cascade`, every grant of the same role
    /// on a resource contained by `entry.resource`. Returns the removed tuples,
    /// exact tuple first.
    async fn revoke(
        &self,
        key: &CatalogRoleKey,
        entry: GrantEntry,
        cascade: bool,
        expected: Option<u64>,
    ) -> StoreResult<Vec<Grant>>;
    async fn grants_for_catalog_role(&self, key: &CatalogRoleKey) -> StoreResult<Vec<Grant>>;
    async fn grants_for_resource(
        &self,
        catalog_name: &str,
        resource: &Resource,
    ) -> StoreResult<Vec<Grant>>;
}

/// Backend handle used by the HTTP layer.
#[async_trait]
pub trait AccessStore: RoleStore + GrantStore {
    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
