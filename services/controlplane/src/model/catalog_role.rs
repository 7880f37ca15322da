//! Catalog role records and keys.
//!
//! # Purpose
//! A catalog role is scoped to exactly one catalog and owns the grants made
//! to it. `catalog_name` never changes after creation.
use super::Properties;
use lattice_authz::INITIAL_ENTITY_VERSION;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity of a catalog role. Ordered by catalog, then role name.
#[derive(
    Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRoleKey {
    pub catalog_name: String,
    pub catalog_role_name: String,
}

impl CatalogRoleKey {
    pub fn new(catalog_name: impl Into<String>, catalog_role_name: impl Into<String>) -> Self {
        Self {
            catalog_name: catalog_name.into(),
            catalog_role_name: catalog_role_name.into(),
        }
    }
}

impl std::fmt::Display for CatalogRoleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.catalog_name, self.catalog_role_name)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRole {
    pub catalog_name: String,
    pub name: String,
    #[serde(default)]
    pub properties: Properties,
    pub entity_version: u64,
}

impl CatalogRole {
    pub fn new(
        catalog_name: impl Into<String>,
        name: impl Into<String>,
        properties: Properties,
    ) -> Self {
        Self {
            catalog_name: catalog_name.into(),
            name: name.into(),
            properties,
            entity_version: INITIAL_ENTITY_VERSION,
        }
    }

    pub fn key(&self) -> CatalogRoleKey {
        CatalogRoleKey::new(&self.catalog_name, &self.name)
    }
}
