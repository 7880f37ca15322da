//! Principal role records.
use super::Properties;
use lattice_authz::INITIAL_ENTITY_VERSION;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Named group of principals; the link between principals and catalog roles.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalRole {
    pub name: String,
    #[serde(default)]
    pub properties: Properties,
    pub entity_version: u64,
}

impl PrincipalRole {
    pub fn new(name: impl Into<String>, properties: Properties) -> Self {
        Self {
            name: name.into(),
            properties,
            entity_version: INITIAL_ENTITY_VERSION,
        }
    }
}
