//! Grant API handlers.
//!
//! # Purpose
//! Adds and revokes (resource, privilege) tuples on a catalog role and lists
//! grants by role or by resource.
//!
//! # Key invariants
//! - Adding a grant that already exists succeeds and leaves the role version alone.
//! - Revoke answers with every removed tuple, the requested one first; with
//!   `cascade` the role's grants on contained resources go in the same step.
use crate::api::error::{ApiError, store_error};
use crate::api::{ApiJson, expected_version};
use crate::api::types::{
    AddGrantRequest, GrantListResponse, GrantSearchRequest, RevokeGrantRequest,
    RevokeGrantResponse,
};
use crate::app::AppState;
use crate::model::{CatalogRoleKey, Grant};
use axum::Json;
use axum::extract::{Path, State};

#[utoipa::path(
    get,
    path = "/api/management/v1/catalogs/{catalog}/catalog-roles/{catalog_role}/grants",
    tag = "grants",
    params(
        ("catalog" = String, Path, description = "Catalog name"),
        ("catalog_role" = String, Path, description = "Catalog role name")
    ),
    responses(
        (status = 200, description = "Grants owned by the catalog role", body = GrantListResponse),
        (status = 404, description = "Catalog role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_grants(
    Path((catalog, catalog_role)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<GrantListResponse>, ApiError> {
    let items = state
        .store
        .grants_for_catalog_role(&CatalogRoleKey::new(catalog, catalog_role))
        .await
        .map_err(|err| store_error("failed to list grants", err))?;
    Ok(Json(GrantListResponse { items }))
}

#[utoipa::path(
    put,
    path = "/api/management/v1/catalogs/{catalog}/catalog-roles/{catalog_role}/grants",
    tag = "grants",
    params(
        ("catalog" = String, Path, description = "Catalog name"),
        ("catalog_role" = String, Path, description = "Catalog role name")
    ),
    request_body = AddGrantRequest,
    responses(
        (status = 200, description = "Grant present", body = Grant),
        (status = 400, description = "Invalid resource or privilege", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Catalog role not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn add_grant(
    Path((catalog, catalog_role)): Path<(String, String)>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AddGrantRequest>,
) -> Result<Json<Grant>, ApiError> {
    let expected = expected_version(&state, body.current_entity_version)?;
    let grant = state
        .store
        .grant(&CatalogRoleKey::new(catalog, catalog_role), body.grant, expected)
        .await
        .map_err(|err| store_error("failed to add grant", err))?;
    Ok(Json(grant))
}

#[utoipa::path(
    post,
    path = "/api/management/v1/catalogs/{catalog}/catalog-roles/{catalog_role}/grants/revoke",
    tag = "grants",
    params(
        ("catalog" = String, Path, description = "Catalog name"),
        ("catalog_role" = String, Path, description = "Catalog role name")
    ),
    request_body = RevokeGrantRequest,
    responses(
        (status = 200, description = "Removed grants, requested grant first", body = RevokeGrantResponse),
        (status = 404, description = "Catalog role or grant not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn revoke_grant(
    Path((catalog, catalog_role)): Path<(String, String)>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RevokeGrantRequest>,
) -> Result<Json<RevokeGrantResponse>, ApiError> {
    let expected = expected_version(&state, body.current_entity_version)?;
    let removed = state
        .store
        .revoke(
            &CatalogRoleKey::new(catalog, catalog_role),
            body.grant,
            body.cascade,
            expected,
        )
        .await
        .map_err(|err| store_error("failed to revoke grant", err))?;
    Ok(Json(RevokeGrantResponse { removed }))
}

#[utoipa::path(
    post,
    path = "/api/management/v1/catalogs/{catalog}/grants/search",
    tag = "grants",
    params(("catalog" = String, Path, description = "Catalog name")),
    request_body = GrantSearchRequest,
    responses(
        (status = 200, description = "Grants on exactly this resource across catalog roles", body = GrantListResponse),
        (status = 400, description = "Invalid resource", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn search_grants(
    Path(catalog): Path<String>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<GrantSearchRequest>,
) -> Result<Json<GrantListResponse>, ApiError> {
    let items = state
        .store
        .grants_for_resource(&catalog, &body.resource)
        .await
        .map_err(|err| store_error("failed to search grants", err))?;
    Ok(Json(GrantListResponse { items }))
}
