//! Grant tuples.
//!
//! # Purpose
//! A grant is the tuple (catalog, catalog role, resource, privilege). On the
//! wire the resource fields are inlined next to the grant fields:
//! `{"type":"table","namespace":["sales"],"tableName":"orders","privilege":"SELECT",
//! "catalogName":"prod","catalogRoleName":"analysts"}`.
use super::CatalogRoleKey;
use lattice_authz::{AuthzResult, Privilege, Resource};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

/// Resource and privilege half of a grant, as sent by callers.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq, Hash)]
pub struct GrantEntry {
    #[serde(flatten)]
    pub resource: Resource,
    pub privilege: Privilege,
}

impl GrantEntry {
    pub fn new(resource: Resource, privilege: Privilege) -> Self {
        Self {
            resource,
            privilege,
        }
    }

    /// Re-check fields that deserialization accepts without validation.
    pub fn validate(&self) -> AuthzResult<()> {
        self.resource.validate()?;
        self.privilege.validate()
    }

    /// Uniqueness key of the tuple inside one catalog role.
    pub fn identity(&self) -> (String, String) {
        (
            self.resource.storage_key(),
            self.privilege.as_str().to_string(),
        )
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub catalog_name: String,
    pub catalog_role_name: String,
    #[serde(flatten)]
    pub resource: Resource,
    pub privilege: Privilege,
}

impl Grant {
    pub fn new(key: &CatalogRoleKey, entry: GrantEntry) -> Self {
        Self {
            catalog_name: key.catalog_name.clone(),
            catalog_role_name: key.catalog_role_name.clone(),
            resource: entry.resource,
            privilege: entry.privilege,
        }
    }

    pub fn key(&self) -> CatalogRoleKey {
        CatalogRoleKey::new(&self.catalog_name, &self.catalog_role_name)
    }

    pub fn entry(&self) -> GrantEntry {
        GrantEntry::new(self.resource.clone(), self.privilege.clone())
    }

    /// Listing order: resource path, then privilege, then the rest of the tuple.
    pub fn listing_order(&self, other: &Grant) -> Ordering {
        self.resource
            .path()
            .cmp(&other.resource.path())
            .then_with(|| self.privilege.cmp(&other.privilege))
            .then_with(|| self.resource.kind().cmp(&other.resource.kind()))
            .then_with(|| self.catalog_name.cmp(&other.catalog_name))
            .then_with(|| self.catalog_role_name.cmp(&other.catalog_role_name))
    }
}

/// Sort grants into listing order.
pub(crate) fn sort_grants(grants: &mut [Grant]) {
    grants.sort_by(Grant::listing_order);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_wire_shape_inlines_resource() {
        let key = CatalogRoleKey::new("prod", "analysts");
        let grant = Grant::new(
            &key,
            GrantEntry::new(
                Resource::table(["sales"], "orders"),
                Privilege::parse("SELECT").expect("privilege"),
            ),
        );
        let value = serde_json::to_value(&grant).expect("json");
        assert_eq!(
            value,
            serde_json::json!({
                "catalogName": "prod",
                "catalogRoleName": "analysts",
                "type": "table",
                "namespace": ["sales"],
                "tableName": "orders",
                "privilege": "SELECT"
            })
        );
        let back: Grant = serde_json::from_value(value).expect("round trip");
        assert_eq!(back, grant);
        assert_eq!(back.key(), key);
    }

    #[test]
    fn entry_accepts_catalog_without_extra_fields() {
        let entry: GrantEntry = serde_json::from_value(serde_json::json!({
            "type": "catalog",
            "privilege": "CATALOG_MANAGE_ACCESS"
        }))
        .expect("entry");
        assert_eq!(entry.resource, Resource::Catalog);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn entry_validation_rejects_blank_parts() {
        let entry: GrantEntry = serde_json::from_value(serde_json::json!({
            "type": "namespace",
            "namespace": ["a", ""],
            "privilege": "SELECT"
        }))
        .expect("entry");
        assert!(entry.validate().is_err());

        let entry: GrantEntry = serde_json::from_value(serde_json::json!({
            "type": "catalog",
            "privilege": ""
        }))
        .expect("entry");
        assert!(entry.validate().is_err());
    }

    #[test]
    fn listing_order_is_path_then_privilege() {
        let key = CatalogRoleKey::new("prod", "analysts");
        let grant = |resource: Resource, privilege: &str| {
            Grant::new(
                &key,
                GrantEntry::new(resource, Privilege::parse(privilege).expect("privilege")),
            )
        };
        let mut grants = vec![
            grant(Resource::table(["b"], "t"), "SELECT"),
            grant(Resource::namespace(["a"]), "TABLE_READ_DATA"),
            grant(Resource::namespace(["a"]), "SELECT"),
        ];
        sort_grants(&mut grants);
        let rendered: Vec<_> = grants
            .iter()
            .map(|g| format!("{} {}", g.resource.path(), g.privilege))
            .collect();
        assert_eq!(
            rendered,
            vec!["a SELECT", "a TABLE_READ_DATA", "b.t SELECT"]
        );
    }
}
