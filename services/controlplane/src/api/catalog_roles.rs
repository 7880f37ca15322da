//! Catalog role API handlers.
//!
//! # Purpose
//! Catalog roles are scoped to a catalog and own grant sets; the grant routes
//! live in [`crate::api::grants`].
use crate::api::error::{ApiError, store_error};
use crate::api::{ApiJson, ApiQuery, expected_version};
use crate::api::types::{
    CatalogRoleListResponse, CreateCatalogRoleRequest, PrincipalRoleListResponse,
    UpdateEntityRequest, VersionQuery,
};
use crate::app::AppState;
use crate::model::{CatalogRole, CatalogRoleKey, EntityUpdate};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/api/management/v1/catalogs/{catalog}/catalog-roles",
    tag = "catalog-roles",
    params(("catalog" = String, Path, description = "Catalog name")),
    responses(
        (status = 200, description = "Catalog roles of the catalog", body = CatalogRoleListResponse)
    )
)]
pub(crate) async fn list_catalog_roles(
    Path(catalog): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CatalogRoleListResponse>, ApiError> {
    let items = state
        .store
        .list_catalog_roles(&catalog)
        .await
        .map_err(|err| store_error("failed to list catalog roles", err))?;
    Ok(Json(CatalogRoleListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/management/v1/catalogs/{catalog}/catalog-roles",
    tag = "catalog-roles",
    params(("catalog" = String, Path, description = "Catalog name")),
    request_body = CreateCatalogRoleRequest,
    responses(
        (status = 201, description = "Catalog role created", body = CatalogRole),
        (status = 409, description = "Catalog role already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_catalog_role(
    Path(catalog): Path<String>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateCatalogRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = state
        .store
        .create_catalog_role(CatalogRole::new(catalog, body.name, body.properties))
        .await
        .map_err(|err| store_error("failed to create catalog role", err))?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/management/v1/catalogs/{catalog}/catalog-roles/{catalog_role}",
    tag = "catalog-roles",
    params(
        ("catalog" = String, Path, description = "Catalog name"),
        ("catalog_role" = String, Path, description = "Catalog role name")
    ),
    responses(
        (status = 200, description = "Catalog role", body = CatalogRole),
        (status = 404, description = "Catalog role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_catalog_role(
    Path((catalog, catalog_role)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<CatalogRole>, ApiError> {
    let role = state
        .store
        .get_catalog_role(&CatalogRoleKey::new(catalog, catalog_role))
        .await
        .map_err(|err| store_error("failed to load catalog role", err))?;
    Ok(Json(role))
}

#[utoipa::path(
    put,
    path = "/api/management/v1/catalogs/{catalog}/catalog-roles/{catalog_role}",
    tag = "catalog-roles",
    params(
        ("catalog" = String, Path, description = "Catalog name"),
        ("catalog_role" = String, Path, description = "Catalog role name")
    ),
    request_body = UpdateEntityRequest,
    responses(
        (status = 200, description = "Catalog role updated", body = CatalogRole),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_catalog_role(
    Path((catalog, catalog_role)): Path<(String, String)>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdateEntityRequest>,
) -> Result<Json<CatalogRole>, ApiError> {
    let update = EntityUpdate {
        properties: body.properties,
        expected_version: expected_version(&state, body.current_entity_version)?,
    };
    let role = state
        .store
        .update_catalog_role(&CatalogRoleKey::new(catalog, catalog_role), update)
        .await
        .map_err(|err| store_error("failed to update catalog role", err))?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/management/v1/catalogs/{catalog}/catalog-roles/{catalog_role}",
    tag = "catalog-roles",
    params(
        ("catalog" = String, Path, description = "Catalog name"),
        ("catalog_role" = String, Path, description = "Catalog role name"),
        VersionQuery
    ),
    responses(
        (status = 204, description = "Catalog role deleted with its bindings and grants"),
        (status = 404, description = "Catalog role not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_catalog_role(
    Path((catalog, catalog_role)): Path<(String, String)>,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VersionQuery>,
) -> Result<StatusCode, ApiError> {
    let expected = expected_version(&state, query.current_entity_version)?;
    state
        .store
        .delete_catalog_role(&CatalogRoleKey::new(catalog, catalog_role), expected)
        .await
        .map_err(|err| store_error("failed to delete catalog role", err))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/management/v1/catalogs/{catalog}/catalog-roles/{catalog_role}/principal-roles",
    tag = "catalog-roles",
    params(
        ("catalog" = String, Path, description = "Catalog name"),
        ("catalog_role" = String, Path, description = "Catalog role name")
    ),
    responses(
        (status = 200, description = "Principal roles bound to the catalog role", body = PrincipalRoleListResponse),
        (status = 404, description = "Catalog role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_bound_principal_roles(
    Path((catalog, catalog_role)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<PrincipalRoleListResponse>, ApiError> {
    let items = state
        .store
        .principal_roles_for_catalog_role(&CatalogRoleKey::new(catalog, catalog_role))
        .await
        .map_err(|err| store_error("failed to list principal roles", err))?;
    Ok(Json(PrincipalRoleListResponse { items }))
}
