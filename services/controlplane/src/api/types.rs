//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the payload shapes of the management API and their OpenAPI
//! schemas. Field names are camelCase on the wire.
use crate::model::{CatalogRole, Grant, GrantEntry, Principal, PrincipalRole, Properties};
use lattice_authz::Resource;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    pub durable_storage: bool,
    pub entity_version_required: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreatePrincipalRequest {
    pub name: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreatePrincipalRoleRequest {
    pub name: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreateCatalogRoleRequest {
    pub name: String,
    #[serde(default)]
    pub properties: Properties,
}

/// Replaces the entity's properties.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityRequest {
    pub current_entity_version: Option<u64>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AssignPrincipalRoleRequest {
    pub principal_role_name: String,
    /// Expected version of the principal.
    pub current_entity_version: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BindCatalogRoleRequest {
    pub catalog_role_name: String,
    /// Expected version of the principal role.
    pub current_entity_version: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AddGrantRequest {
    pub grant: GrantEntry,
    /// Expected version of the catalog role.
    pub current_entity_version: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RevokeGrantRequest {
    pub grant: GrantEntry,
    /// Also remove the role's grants on resources under `grant`'s resource.
    #[serde(default)]
    pub cascade: bool,
    /// Expected version of the catalog role.
    pub current_entity_version: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RevokeGrantResponse {
    pub removed: Vec<Grant>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GrantSearchRequest {
    pub resource: Resource,
}

#[derive(Debug, Default, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct VersionQuery {
    /// Expected entity version; rejected with 409 when stale.
    pub current_entity_version: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PrincipalListResponse {
    pub items: Vec<Principal>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PrincipalRoleListResponse {
    pub items: Vec<PrincipalRole>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogRoleListResponse {
    pub items: Vec<CatalogRole>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GrantListResponse {
    pub items: Vec<Grant>,
}
