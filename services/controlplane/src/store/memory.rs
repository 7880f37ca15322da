//! In-memory implementation of the access-control store.
//!
//! # Purpose
//! Implements [`RoleStore`], [`GrantStore`] and [`AccessStore`] entirely in
//! memory using maps guarded by `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: each mutation holds the write locks of
//!   every structure it touches for its whole duration, so the version check,
//!   the edit and the version bump are one step.
//!
//! # Lock order
//! Locks are always acquired in this order, and never in reverse:
//! `principals → principal_roles → catalog_roles → assignments → bindings → grants`.
//! Operations skip the structures they do not need but keep the relative order,
//! which rules out lock-order deadlocks between concurrent mutations.
//!
//! # Metrics
//! Grant changes and the grant gauge match the Postgres backend.
use super::{
    AccessStore, GrantStore, RoleStore, StoreError, StoreResult, check_version, record_grant_delta,
};
use crate::model::{
    CatalogRole, CatalogRoleKey, EntityUpdate, Grant, GrantEntry, Principal, PrincipalRole,
    sort_grants,
};
use async_trait::async_trait;
use lattice_authz::{INITIAL_ENTITY_VERSION, Resource, validate_name};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Grants of one catalog role keyed by [`GrantEntry::identity`].
type GrantSet = BTreeMap<(String, String), Grant>;

/// In-memory access-control store.
///
/// Edges are kept in ordered sets so listings come out sorted without an
/// extra pass.
#[derive(Default)]
pub struct InMemoryStore {
    principals: RwLock<HashMap<String, Principal>>,
    principal_roles: RwLock<HashMap<String, PrincipalRole>>,
    catalog_roles: RwLock<HashMap<CatalogRoleKey, CatalogRole>>,
    /// `(principal, principal_role)` edges.
    assignments: RwLock<BTreeSet<(String, String)>>,
    /// `(principal_role, catalog_role)` edges.
    bindings: RwLock<BTreeSet<(String, CatalogRoleKey)>>,
    grants: RwLock<HashMap<CatalogRoleKey, GrantSet>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn principal_not_found(name: &str) -> StoreError {
    StoreError::NotFound(format!("principal {name}"))
}

fn principal_role_not_found(name: &str) -> StoreError {
    StoreError::NotFound(format!("principal role {name}"))
}

fn catalog_role_not_found(key: &CatalogRoleKey) -> StoreError {
    StoreError::NotFound(format!(
        "catalog role {} in catalog {}",
        key.catalog_role_name, key.catalog_name
    ))
}

fn validate_catalog_role_key(key: &CatalogRoleKey) -> StoreResult<()> {
    validate_name("catalog", &key.catalog_name)?;
    validate_name("catalog role", &key.catalog_role_name)?;
    Ok(())
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn create_principal(&self, principal: Principal) -> StoreResult<Principal> {
        validate_name("principal", &principal.name)?;
        let mut principals = self.principals.write().await;
        if principals.contains_key(&principal.name) {
            return Err(StoreError::AlreadyExists(format!(
                "principal {}",
                principal.name
            )));
        }
        let principal = Principal {
            entity_version: INITIAL_ENTITY_VERSION,
            ..principal
        };
        principals.insert(principal.name.clone(), principal.clone());
        tracing::info!(principal = %principal.name, "principal created");
        Ok(principal)
    }

    async fn get_principal(&self, name: &str) -> StoreResult<Principal> {
        self.principals
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| principal_not_found(name))
    }

    async fn list_principals(&self) -> StoreResult<Vec<Principal>> {
        let mut items: Vec<_> = self.principals.read().await.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn update_principal(&self, name: &str, update: EntityUpdate) -> StoreResult<Principal> {
        let mut principals = self.principals.write().await;
        let principal = principals
            .get_mut(name)
            .ok_or_else(|| principal_not_found(name))?;
        principal.entity_version = check_version(
            "principal",
            name,
            principal.entity_version,
            update.expected_version,
            true,
        )?;
        principal.properties = update.properties;
        Ok(principal.clone())
    }

    async fn delete_principal(&self, name: &str, expected: Option<u64>) -> StoreResult<()> {
        let mut principals = self.principals.write().await;
        let current = principals
            .get(name)
            .ok_or_else(|| principal_not_found(name))?
            .entity_version;
        check_version("principal", name, current, expected, true)?;
        let mut assignments = self.assignments.write().await;
        principals.remove(name);
        assignments.retain(|(principal, _)| principal != name);
        tracing::info!(principal = %name, "principal deleted");
        Ok(())
    }

    async fn create_principal_role(&self, role: PrincipalRole) -> StoreResult<PrincipalRole> {
        validate_name("principal role", &role.name)?;
        let mut roles = self.principal_roles.write().await;
        if roles.contains_key(&role.name) {
            return Err(StoreError::AlreadyExists(format!(
                "principal role {}",
                role.name
            )));
        }
        let role = PrincipalRole {
            entity_version: INITIAL_ENTITY_VERSION,
            ..role
        };
        roles.insert(role.name.clone(), role.clone());
        tracing::info!(principal_role = %role.name, "principal role created");
        Ok(role)
    }

    async fn get_principal_role(&self, name: &str) -> StoreResult<PrincipalRole> {
        self.principal_roles
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| principal_role_not_found(name))
    }

    async fn list_principal_roles(&self) -> StoreResult<Vec<PrincipalRole>> {
        let mut items: Vec<_> = self
            .principal_roles
            .read()
            .await
            .values()
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn update_principal_role(
        &self,
        name: &str,
        update: EntityUpdate,
    ) -> StoreResult<PrincipalRole> {
        let mut roles = self.principal_roles.write().await;
        let role = roles
            .get_mut(name)
            .ok_or_else(|| principal_role_not_found(name))?;
        role.entity_version = check_version(
            "principal_role",
            name,
            role.entity_version,
            update.expected_version,
            true,
        )?;
        role.properties = update.properties;
        Ok(role.clone())
    }

    async fn delete_principal_role(&self, name: &str, expected: Option<u64>) -> StoreResult<()> {
        let mut roles = self.principal_roles.write().await;
        let current = roles
            .get(name)
            .ok_or_else(|| principal_role_not_found(name))?
            .entity_version;
        check_version("principal_role", name, current, expected, true)?;
        let mut assignments = self.assignments.write().await;
        let mut bindings = self.bindings.write().await;
        roles.remove(name);
        assignments.retain(|(_, role)| role != name);
        bindings.retain(|(role, _)| role != name);
        tracing::info!(principal_role = %name, "principal role deleted");
        Ok(())
    }

    async fn create_catalog_role(&self, role: CatalogRole) -> StoreResult<CatalogRole> {
        let key = role.key();
        validate_catalog_role_key(&key)?;
        let mut roles = self.catalog_roles.write().await;
        if roles.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!(
                "catalog role {} in catalog {}",
                key.catalog_role_name, key.catalog_name
            )));
        }
        let role = CatalogRole {
            entity_version: INITIAL_ENTITY_VERSION,
            ..role
        };
        roles.insert(key.clone(), role.clone());
        tracing::info!(catalog_role = %key, "catalog role created");
        Ok(role)
    }

    async fn get_catalog_role(&self, key: &CatalogRoleKey) -> StoreResult<CatalogRole> {
        self.catalog_roles
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| catalog_role_not_found(key))
    }

    async fn list_catalog_roles(&self, catalog_name: &str) -> StoreResult<Vec<CatalogRole>> {
        let mut items: Vec<_> = self
            .catalog_roles
            .read()
            .await
            .values()
            .filter(|role| role.catalog_name == catalog_name)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn update_catalog_role(
        &self,
        key: &CatalogRoleKey,
        update: EntityUpdate,
    ) -> StoreResult<CatalogRole> {
        let mut roles = self.catalog_roles.write().await;
        let role = roles
            .get_mut(key)
            .ok_or_else(|| catalog_role_not_found(key))?;
        role.entity_version = check_version(
            "catalog_role",
            &key.to_string(),
            role.entity_version,
            update.expected_version,
            true,
        )?;
        role.properties = update.properties;
        Ok(role.clone())
    }

    async fn delete_catalog_role(
        &self,
        key: &CatalogRoleKey,
        expected: Option<u64>,
    ) -> StoreResult<()> {
        let mut roles = self.catalog_roles.write().await;
        let current = roles
            .get(key)
            .ok_or_else(|| catalog_role_not_found(key))?
            .entity_version;
        check_version("catalog_role", &key.to_string(), current, expected, true)?;
        let mut bindings = self.bindings.write().await;
        let mut grants = self.grants.write().await;
        roles.remove(key);
        bindings.retain(|(_, bound)| bound != key);
        let dropped = grants.remove(key).map(|set| set.len()).unwrap_or(0);
        record_grant_delta(0, dropped);
        tracing::info!(catalog_role = %key, dropped_grants = dropped, "catalog role deleted");
        Ok(())
    }

    async fn assign_principal_role(
        &self,
        principal: &str,
        principal_role: &str,
        expected: Option<u64>,
    ) -> StoreResult<Principal> {
        let mut principals = self.principals.write().await;
        let entity = principals
            .get_mut(principal)
            .ok_or_else(|| principal_not_found(principal))?;
        if !self
            .principal_roles
            .read()
            .await
            .contains_key(principal_role)
        {
            return Err(principal_role_not_found(principal_role));
        }
        let mut assignments = self.assignments.write().await;
        let edge = (principal.to_string(), principal_role.to_string());
        let changed = !assignments.contains(&edge);
        entity.entity_version = check_version(
            "principal",
            principal,
            entity.entity_version,
            expected,
            changed,
        )?;
        if changed {
            assignments.insert(edge);
            tracing::info!(principal, principal_role, "principal role assigned");
        }
        Ok(entity.clone())
    }

    async fn revoke_principal_role(
        &self,
        principal: &str,
        principal_role: &str,
        expected: Option<u64>,
    ) -> StoreResult<Principal> {
        let mut principals = self.principals.write().await;
        let entity = principals
            .get_mut(principal)
            .ok_or_else(|| principal_not_found(principal))?;
        if !self
            .principal_roles
            .read()
            .await
            .contains_key(principal_role)
        {
            return Err(principal_role_not_found(principal_role));
        }
        let mut assignments = self.assignments.write().await;
        let edge = (principal.to_string(), principal_role.to_string());
        if !assignments.contains(&edge) {
            return Err(StoreError::NotFound(format!(
                "principal role {principal_role} is not assigned to principal {principal}"
            )));
        }
        entity.entity_version = check_version(
            "principal",
            principal,
            entity.entity_version,
            expected,
            true,
        )?;
        assignments.remove(&edge);
        tracing::info!(principal, principal_role, "principal role revoked");
        Ok(entity.clone())
    }

    async fn bind_catalog_role(
        &self,
        principal_role: &str,
        key: &CatalogRoleKey,
        expected: Option<u64>,
    ) -> StoreResult<PrincipalRole> {
        let mut roles = self.principal_roles.write().await;
        let role = roles
            .get_mut(principal_role)
            .ok_or_else(|| principal_role_not_found(principal_role))?;
        if !self.catalog_roles.read().await.contains_key(key) {
            return Err(catalog_role_not_found(key));
        }
        let mut bindings = self.bindings.write().await;
        let edge = (principal_role.to_string(), key.clone());
        let changed = !bindings.contains(&edge);
        role.entity_version = check_version(
            "principal_role",
            principal_role,
            role.entity_version,
            expected,
            changed,
        )?;
        if changed {
            bindings.insert(edge);
            tracing::info!(principal_role, catalog_role = %key, "catalog role bound");
        }
        Ok(role.clone())
    }

    async fn unbind_catalog_role(
        &self,
        principal_role: &str,
        key: &CatalogRoleKey,
        expected: Option<u64>,
    ) -> StoreResult<PrincipalRole> {
        let mut roles = self.principal_roles.write().await;
        let role = roles
            .get_mut(principal_role)
            .ok_or_else(|| principal_role_not_found(principal_role))?;
        if !self.catalog_roles.read().await.contains_key(key) {
            return Err(catalog_role_not_found(key));
        }
        let mut bindings = self.bindings.write().await;
        let edge = (principal_role.to_string(), key.clone());
        if !bindings.contains(&edge) {
            return Err(StoreError::NotFound(format!(
                "catalog role {key} is not bound to principal role {principal_role}"
            )));
        }
        role.entity_version = check_version(
            "principal_role",
            principal_role,
            role.entity_version,
            expected,
            true,
        )?;
        bindings.remove(&edge);
        tracing::info!(principal_role, catalog_role = %key, "catalog role unbound");
        Ok(role.clone())
    }

    async fn principal_roles_for_principal(
        &self,
        principal: &str,
    ) -> StoreResult<Vec<PrincipalRole>> {
        let principals = self.principals.read().await;
        if !principals.contains_key(principal) {
            return Err(principal_not_found(principal));
        }
        let roles = self.principal_roles.read().await;
        let assignments = self.assignments.read().await;
        Ok(assignments
            .iter()
            .filter(|(assigned, _)| assigned == principal)
            .filter_map(|(_, role)| roles.get(role).cloned())
            .collect())
    }

    async fn principals_for_principal_role(
        &self,
        principal_role: &str,
    ) -> StoreResult<Vec<Principal>> {
        let principals = self.principals.read().await;
        let roles = self.principal_roles.read().await;
        if !roles.contains_key(principal_role) {
            return Err(principal_role_not_found(principal_role));
        }
        let assignments = self.assignments.read().await;
        let mut items: Vec<_> = assignments
            .iter()
            .filter(|(_, role)| role == principal_role)
            .filter_map(|(principal, _)| principals.get(principal).cloned())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn catalog_roles_for_principal_role(
        &self,
        principal_role: &str,
        catalog_name: Option<&str>,
    ) -> StoreResult<Vec<CatalogRole>> {
        let roles = self.principal_roles.read().await;
        if !roles.contains_key(principal_role) {
            return Err(principal_role_not_found(principal_role));
        }
        let catalog_roles = self.catalog_roles.read().await;
        let bindings = self.bindings.read().await;
        Ok(bindings
            .iter()
            .filter(|(role, key)| {
                role == principal_role
                    && catalog_name.is_none_or(|catalog| key.catalog_name == catalog)
            })
            .filter_map(|(_, key)| catalog_roles.get(key).cloned())
            .collect())
    }

    async fn principal_roles_for_catalog_role(
        &self,
        key: &CatalogRoleKey,
    ) -> StoreResult<Vec<PrincipalRole>> {
        let roles = self.principal_roles.read().await;
        if !self.catalog_roles.read().await.contains_key(key) {
            return Err(catalog_role_not_found(key));
        }
        let bindings = self.bindings.read().await;
        let mut items: Vec<_> = bindings
            .iter()
            .filter(|(_, bound)| bound == key)
            .filter_map(|(role, _)| roles.get(role).cloned())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn effective_catalog_roles(&self, principal: &str) -> StoreResult<Vec<CatalogRole>> {
        let principals = self.principals.read().await;
        if !principals.contains_key(principal) {
            return Err(principal_not_found(principal));
        }
        let catalog_roles = self.catalog_roles.read().await;
        let assignments = self.assignments.read().await;
        let bindings = self.bindings.read().await;
        let assigned: BTreeSet<&str> = assignments
            .iter()
            .filter(|(assigned, _)| assigned == principal)
            .map(|(_, role)| role.as_str())
            .collect();
        let reachable: BTreeSet<&CatalogRoleKey> = bindings
            .iter()
            .filter(|(role, _)| assigned.contains(role.as_str()))
            .map(|(_, key)| key)
            .collect();
        Ok(reachable
            .into_iter()
            .filter_map(|key| catalog_roles.get(key).cloned())
            .collect())
    }
}

#[async_trait]
impl GrantStore for InMemoryStore {
    async fn grant(
        &self,
        key: &CatalogRoleKey,
        entry: GrantEntry,
        expected: Option<u64>,
    ) -> StoreResult<Grant> {
        entry.validate()?;
        let mut roles = self.catalog_roles.write().await;
        let role = roles
            .get_mut(key)
            .ok_or_else(|| catalog_role_not_found(key))?;
        let mut grants = self.grants.write().await;
        let identity = entry.identity();
        let changed = !grants
            .get(key)
            .is_some_and(|set| set.contains_key(&identity));
        role.entity_version = check_version(
            "catalog_role",
            &key.to_string(),
            role.entity_version,
            expected,
            changed,
        )?;
        let grant = Grant::new(key, entry);
        if changed {
            grants
                .entry(key.clone())
                .or_default()
                .insert(identity, grant.clone());
            metrics::counter!("lattice_grant_changes_total", "op" => "grant").increment(1);
            record_grant_delta(1, 0);
            tracing::info!(
                catalog_role = %key,
                resource = %grant.resource.path(),
                privilege = %grant.privilege,
                "privilege granted"
            );
        }
        Ok(grant)
    }

    async fn revoke(
        &self,
        key: &CatalogRoleKey,
        entry: GrantEntry,
        cascade: bool,
        expected: Option<u64>,
    ) -> StoreResult<Vec<Grant>> {
        entry.validate()?;
        let mut roles = self.catalog_roles.write().await;
        let role = roles
            .get_mut(key)
            .ok_or_else(|| catalog_role_not_found(key))?;
        let mut grants = self.grants.write().await;
        let identity = entry.identity();
        let Some(set) = grants
            .get_mut(key)
            .filter(|set| set.contains_key(&identity))
        else {
            return Err(StoreError::NotFound(format!(
                "grant {} on {} {} for catalog role {key}",
                entry.privilege,
                entry.resource.kind(),
                entry.resource.path()
            )));
        };
        role.entity_version = check_version(
            "catalog_role",
            &key.to_string(),
            role.entity_version,
            expected,
            true,
        )?;

        // Everything below runs under the same write locks; no await points.
        let mut removal: Vec<(String, String)> = vec![identity.clone()];
        if cascade {
            removal.extend(
                set.iter()
                    .filter(|(id, grant)| {
                        **id != identity && entry.resource.contains(&grant.resource)
                    })
                    .map(|(id, _)| id.clone()),
            );
        }
        let mut removed: Vec<Grant> = removal
            .iter()
            .filter_map(|id| set.remove(id))
            .collect();
        if set.is_empty() {
            grants.remove(key);
        }
        sort_grants(&mut removed[1..]);

        metrics::counter!("lattice_grant_changes_total", "op" => "revoke")
            .increment(removed.len() as u64);
        record_grant_delta(0, removed.len());
        tracing::info!(
            catalog_role = %key,
            resource = %entry.resource.path(),
            privilege = %entry.privilege,
            cascade,
            removed = removed.len(),
            "privilege revoked"
        );
        Ok(removed)
    }

    async fn grants_for_catalog_role(&self, key: &CatalogRoleKey) -> StoreResult<Vec<Grant>> {
        if !self.catalog_roles.read().await.contains_key(key) {
            return Err(catalog_role_not_found(key));
        }
        let mut items: Vec<_> = self
            .grants
            .read()
            .await
            .get(key)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default();
        sort_grants(&mut items);
        Ok(items)
    }

    async fn grants_for_resource(
        &self,
        catalog_name: &str,
        resource: &Resource,
    ) -> StoreResult<Vec<Grant>> {
        resource.validate()?;
        let mut items: Vec<_> = self
            .grants
            .read()
            .await
            .iter()
            .filter(|(key, _)| key.catalog_name == catalog_name)
            .flat_map(|(_, set)| set.values())
            .filter(|grant| &grant.resource == resource)
            .cloned()
            .collect();
        sort_grants(&mut items);
        Ok(items)
    }
}

#[async_trait]
impl AccessStore for InMemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        // Healthy whenever the process is running.
        Ok(())
    }

    /// In-memory state does not survive a restart.
    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Properties;
    use lattice_authz::Privilege;
    use std::sync::Arc;

    fn privilege(value: &str) -> Privilege {
        Privilege::parse(value).expect("privilege")
    }

    fn entry(resource: Resource, value: &str) -> GrantEntry {
        GrantEntry::new(resource, privilege(value))
    }

    async fn store_with_catalog_role() -> (InMemoryStore, CatalogRoleKey) {
        let store = InMemoryStore::new();
        let role = store
            .create_catalog_role(CatalogRole::new("prod", "analysts", Properties::new()))
            .await
            .expect("catalog role");
        (store, role.key())
    }

    fn grant_gauge(handle: &metrics_exporter_prometheus::PrometheusHandle) -> f64 {
        handle
            .render()
            .lines()
            .find_map(|line| line.strip_prefix("lattice_grants_total "))
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0.0)
    }

    #[test]
    fn grant_gauge_moves_by_changed_tuples() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let (store, key) = store_with_catalog_role().await;
                let sales = Resource::namespace(["sales"]);
                for grant in [
                    entry(sales.clone(), "TABLE_READ_DATA"),
                    entry(Resource::table(["sales"], "orders"), "SELECT"),
                    entry(Resource::namespace(["ops"]), "SELECT"),
                ] {
                    store.grant(&key, grant, None).await.expect("grant");
                }
                store
                    .grant(&key, entry(sales.clone(), "TABLE_READ_DATA"), None)
                    .await
                    .expect("re-grant");
                assert_eq!(grant_gauge(&handle), 3.0);

                store
                    .revoke(&key, entry(sales, "TABLE_READ_DATA"), true, None)
                    .await
                    .expect("revoke");
                assert_eq!(grant_gauge(&handle), 1.0);

                store.delete_catalog_role(&key, None).await.expect("delete");
                assert_eq!(grant_gauge(&handle), 0.0);
            });
        });
    }

    #[tokio::test]
    async fn create_conflicts_and_names_are_validated() {
        let store = InMemoryStore::new();
        let created = store
            .create_principal(Principal::new("alice", Properties::new()))
            .await
            .expect("principal");
        assert_eq!(created.entity_version, INITIAL_ENTITY_VERSION);

        let err = store
            .create_principal(Principal::new("alice", Properties::new()))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let err = store
            .create_principal_role(PrincipalRole::new("a/b", Properties::new()))
            .await
            .expect_err("invalid name");
        assert!(matches!(err, StoreError::Invalid(_)));

        let err = store
            .create_catalog_role(CatalogRole::new("", "analysts", Properties::new()))
            .await
            .expect_err("invalid catalog");
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let store = InMemoryStore::new();
        let role = store
            .create_principal_role(PrincipalRole::new("engineers", Properties::new()))
            .await
            .expect("role");
        let v = role.entity_version;

        let mut properties = Properties::new();
        properties.insert("team".to_string(), "data".to_string());
        let updated = store
            .update_principal_role(
                "engineers",
                EntityUpdate {
                    properties: properties.clone(),
                    expected_version: Some(v),
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.entity_version, v + 1);
        assert_eq!(updated.properties, properties);

        let err = store
            .update_principal_role(
                "engineers",
                EntityUpdate {
                    properties: Properties::new(),
                    expected_version: Some(v),
                },
            )
            .await
            .expect_err("stale");
        assert!(matches!(err, StoreError::VersionConflict { .. }));
        let current = store.get_principal_role("engineers").await.expect("get");
        assert_eq!(current.properties, properties);

        let relaxed = store
            .update_principal_role("engineers", EntityUpdate::default())
            .await
            .expect("last writer wins");
        assert_eq!(relaxed.entity_version, v + 2);
    }

    #[tokio::test]
    async fn grant_is_idempotent_and_bumps_version_once() {
        let (store, key) = store_with_catalog_role().await;
        let table = Resource::table(["sales"], "orders");

        store
            .grant(&key, entry(table.clone(), "SELECT"), Some(1))
            .await
            .expect("grant");
        store
            .grant(&key, entry(table.clone(), "SELECT"), None)
            .await
            .expect("regrant");
        let grants = store.grants_for_catalog_role(&key).await.expect("list");
        assert_eq!(grants.len(), 1);
        assert_eq!(store.get_catalog_role(&key).await.expect("role").entity_version, 2);

        // A stale version is rejected even for a no-op.
        let err = store
            .grant(&key, entry(table, "SELECT"), Some(1))
            .await
            .expect_err("stale no-op");
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn grant_requires_catalog_role_and_valid_entry() {
        let (store, key) = store_with_catalog_role().await;
        let err = store
            .grant(
                &CatalogRoleKey::new("prod", "missing"),
                entry(Resource::Catalog, "SELECT"),
                None,
            )
            .await
            .expect_err("missing role");
        assert!(matches!(err, StoreError::NotFound(_)));

        let err = store
            .grant(&key, entry(Resource::namespace(["a", " "]), "SELECT"), None)
            .await
            .expect_err("blank segment");
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn cascade_revoke_removes_subtree() {
        let (store, key) = store_with_catalog_role().await;
        let ns = Resource::namespace(["a", "b"]);
        let table = Resource::table(["a", "b"], "t");
        let sibling = Resource::table(["a", "bc"], "t");
        for resource in [&ns, &table, &sibling] {
            store
                .grant(&key, entry(resource.clone(), "SELECT"), None)
                .await
                .expect("grant");
        }

        let removed = store
            .revoke(&key, entry(ns.clone(), "SELECT"), true, None)
            .await
            .expect("cascade");
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].resource, ns);
        assert_eq!(removed[1].resource, table);

        let remaining = store.grants_for_catalog_role(&key).await.expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].resource, sibling);
    }

    #[tokio::test]
    async fn non_cascade_revoke_removes_exact_tuple_only() {
        let (store, key) = store_with_catalog_role().await;
        let ns = Resource::namespace(["a", "b"]);
        let table = Resource::table(["a", "b"], "t");
        store
            .grant(&key, entry(ns.clone(), "SELECT"), None)
            .await
            .expect("grant ns");
        store
            .grant(&key, entry(table.clone(), "SELECT"), None)
            .await
            .expect("grant table");

        let removed = store
            .revoke(&key, entry(ns, "SELECT"), false, None)
            .await
            .expect("revoke");
        assert_eq!(removed.len(), 1);
        let remaining = store.grants_for_catalog_role(&key).await.expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].resource, table);
    }

    #[tokio::test]
    async fn cascade_on_catalog_clears_role() {
        let (store, key) = store_with_catalog_role().await;
        store
            .grant(&key, entry(Resource::Catalog, "CATALOG_MANAGE_ACCESS"), None)
            .await
            .expect("catalog");
        store
            .grant(&key, entry(Resource::view(["x"], "v"), "VIEW_READ_PROPERTIES"), None)
            .await
            .expect("view");
        store
            .grant(&key, entry(Resource::policy(Vec::<String>::new(), "p"), "POLICY_APPLY"), None)
            .await
            .expect("policy");

        let removed = store
            .revoke(&key, entry(Resource::Catalog, "CATALOG_MANAGE_ACCESS"), true, None)
            .await
            .expect("cascade");
        assert_eq!(removed.len(), 3);
        assert!(store.grants_for_catalog_role(&key).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn revoke_missing_tuple_is_not_found_and_changes_nothing() {
        let (store, key) = store_with_catalog_role().await;
        let table = Resource::table(["a"], "t");
        store
            .grant(&key, entry(table.clone(), "SELECT"), None)
            .await
            .expect("grant");
        let before = store.get_catalog_role(&key).await.expect("role").entity_version;

        let err = store
            .revoke(&key, entry(Resource::namespace(["a"]), "SELECT"), true, None)
            .await
            .expect_err("absent");
        assert!(matches!(err, StoreError::NotFound(_)));

        let err = store
            .revoke(&key, entry(table, "SELECT"), true, Some(before - 1))
            .await
            .expect_err("stale");
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        assert_eq!(store.grants_for_catalog_role(&key).await.expect("list").len(), 1);
        assert_eq!(
            store.get_catalog_role(&key).await.expect("role").entity_version,
            before
        );
    }

    #[tokio::test]
    async fn concurrent_grants_with_same_version_admit_one_winner() {
        let (store, key) = store_with_catalog_role().await;
        let store = Arc::new(store);
        let mut tasks = Vec::new();
        for idx in 0..8 {
            let store = Arc::clone(&store);
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .grant(
                        &key,
                        entry(Resource::table(["a"], format!("t{idx}")), "SELECT"),
                        Some(INITIAL_ENTITY_VERSION),
                    )
                    .await
            }));
        }
        let mut ok = 0;
        for task in tasks {
            match task.await.expect("join") {
                Ok(_) => ok += 1,
                Err(StoreError::VersionConflict { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(
            store.get_catalog_role(&key).await.expect("role").entity_version,
            INITIAL_ENTITY_VERSION + 1
        );
    }

    #[tokio::test]
    async fn membership_edges_and_effective_roles() {
        let (store, key) = store_with_catalog_role().await;
        store
            .create_principal(Principal::new("p1", Properties::new()))
            .await
            .expect("principal");
        store
            .create_principal_role(PrincipalRole::new("pr1", Properties::new()))
            .await
            .expect("principal role");
        store
            .create_principal_role(PrincipalRole::new("pr2", Properties::new()))
            .await
            .expect("principal role");

        let principal = store
            .assign_principal_role("p1", "pr1", Some(1))
            .await
            .expect("assign");
        assert_eq!(principal.entity_version, 2);
        let again = store
            .assign_principal_role("p1", "pr1", Some(2))
            .await
            .expect("idempotent");
        assert_eq!(again.entity_version, 2);
        store
            .assign_principal_role("p1", "pr2", None)
            .await
            .expect("assign pr2");

        store
            .bind_catalog_role("pr1", &key, None)
            .await
            .expect("bind pr1");
        store
            .bind_catalog_role("pr2", &key, None)
            .await
            .expect("bind pr2");
        let effective = store.effective_catalog_roles("p1").await.expect("effective");
        assert_eq!(effective.len(), 1, "roles reachable twice appear once");
        assert_eq!(effective[0].key(), key);

        let err = store
            .assign_principal_role("p1", "missing", None)
            .await
            .expect_err("missing role");
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store
            .bind_catalog_role("pr1", &CatalogRoleKey::new("prod", "missing"), None)
            .await
            .expect_err("missing catalog role");
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store
            .effective_catalog_roles("nobody")
            .await
            .expect_err("missing principal");
        assert!(matches!(err, StoreError::NotFound(_)));

        let holders = store
            .principals_for_principal_role("pr1")
            .await
            .expect("holders");
        assert_eq!(holders.len(), 1);
        let bound = store
            .principal_roles_for_catalog_role(&key)
            .await
            .expect("bound");
        assert_eq!(bound.len(), 2);
        let filtered = store
            .catalog_roles_for_principal_role("pr1", Some("other"))
            .await
            .expect("filtered");
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn unbinding_keeps_grants() {
        let (store, key) = store_with_catalog_role().await;
        store
            .create_principal(Principal::new("p1", Properties::new()))
            .await
            .expect("principal");
        store
            .create_principal_role(PrincipalRole::new("pr1", Properties::new()))
            .await
            .expect("principal role");
        store
            .assign_principal_role("p1", "pr1", None)
            .await
            .expect("assign");
        store
            .bind_catalog_role("pr1", &key, None)
            .await
            .expect("bind");
        store
            .grant(&key, entry(Resource::table(["sales"], "orders"), "SELECT"), None)
            .await
            .expect("grant");

        store
            .unbind_catalog_role("pr1", &key, None)
            .await
            .expect("unbind");
        assert!(
            store
                .effective_catalog_roles("p1")
                .await
                .expect("effective")
                .is_empty()
        );
        assert_eq!(store.grants_for_catalog_role(&key).await.expect("grants").len(), 1);

        let err = store
            .unbind_catalog_role("pr1", &key, None)
            .await
            .expect_err("edge gone");
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store
            .revoke_principal_role("p1", "pr2", None)
            .await
            .expect_err("role missing");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn deletes_cascade_to_edges_and_grants() {
        let (store, key) = store_with_catalog_role().await;
        store
            .create_principal(Principal::new("p1", Properties::new()))
            .await
            .expect("principal");
        store
            .create_principal_role(PrincipalRole::new("pr1", Properties::new()))
            .await
            .expect("principal role");
        store
            .assign_principal_role("p1", "pr1", None)
            .await
            .expect("assign");
        store
            .bind_catalog_role("pr1", &key, None)
            .await
            .expect("bind");
        store
            .grant(&key, entry(Resource::Catalog, "SELECT"), None)
            .await
            .expect("grant");

        let err = store
            .delete_catalog_role(&key, Some(99))
            .await
            .expect_err("stale delete");
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        store
            .delete_catalog_role(&key, None)
            .await
            .expect("delete catalog role");
        assert!(
            store
                .catalog_roles_for_principal_role("pr1", None)
                .await
                .expect("bindings")
                .is_empty()
        );
        assert!(
            store
                .grants_for_resource("prod", &Resource::Catalog)
                .await
                .expect("grants")
                .is_empty()
        );

        store
            .delete_principal_role("pr1", None)
            .await
            .expect("delete principal role");
        assert!(
            store
                .principal_roles_for_principal("p1")
                .await
                .expect("assignments")
                .is_empty()
        );
        store.delete_principal("p1", Some(2)).await.expect("delete principal");
        let err = store.get_principal("p1").await.expect_err("gone");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn grants_for_resource_spans_roles_in_catalog() {
        let (store, key) = store_with_catalog_role().await;
        let other = store
            .create_catalog_role(CatalogRole::new("prod", "auditors", Properties::new()))
            .await
            .expect("role")
            .key();
        let elsewhere = store
            .create_catalog_role(CatalogRole::new("dev", "analysts", Properties::new()))
            .await
            .expect("role")
            .key();
        let table = Resource::table(["sales"], "orders");
        for k in [&key, &other, &elsewhere] {
            store
                .grant(k, entry(table.clone(), "SELECT"), None)
                .await
                .expect("grant");
        }
        let grants = store
            .grants_for_resource("prod", &table)
            .await
            .expect("search");
        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|g| g.catalog_name == "prod"));
    }

    #[tokio::test]
    async fn backend_health_and_identity() {
        let store = InMemoryStore::new();
        store.health_check().await.expect("health");
        assert!(!store.is_durable());
        assert_eq!(store.backend_name(), "memory");
    }
}
