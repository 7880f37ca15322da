//! Principal role API handlers.
use crate::api::error::{ApiError, store_error};
use crate::api::{ApiJson, ApiQuery, expected_version};
use crate::api::types::{
    BindCatalogRoleRequest, CatalogRoleListResponse, CreatePrincipalRoleRequest,
    PrincipalListResponse, PrincipalRoleListResponse, UpdateEntityRequest, VersionQuery,
};
use crate::app::AppState;
use crate::model::{CatalogRoleKey, EntityUpdate, PrincipalRole};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/api/management/v1/principal-roles",
    tag = "principal-roles",
    responses(
        (status = 200, description = "List principal roles", body = PrincipalRoleListResponse)
    )
)]
pub(crate) async fn list_principal_roles(
    State(state): State<AppState>,
) -> Result<Json<PrincipalRoleListResponse>, ApiError> {
    let items = state
        .store
        .list_principal_roles()
        .await
        .map_err(|err| store_error("failed to list principal roles", err))?;
    Ok(Json(PrincipalRoleListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/management/v1/principal-roles",
    tag = "principal-roles",
    request_body = CreatePrincipalRoleRequest,
    responses(
        (status = 201, description = "Principal role created", body = PrincipalRole),
        (status = 409, description = "Principal role already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_principal_role(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreatePrincipalRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = state
        .store
        .create_principal_role(PrincipalRole::new(body.name, body.properties))
        .await
        .map_err(|err| store_error("failed to create principal role", err))?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/management/v1/principal-roles/{principal_role}",
    tag = "principal-roles",
    params(("principal_role" = String, Path, description = "Principal role name")),
    responses(
        (status = 200, description = "Principal role", body = PrincipalRole),
        (status = 404, description = "Principal role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_principal_role(
    Path(principal_role): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PrincipalRole>, ApiError> {
    let role = state
        .store
        .get_principal_role(&principal_role)
        .await
        .map_err(|err| store_error("failed to load principal role", err))?;
    Ok(Json(role))
}

#[utoipa::path(
    put,
    path = "/api/management/v1/principal-roles/{principal_role}",
    tag = "principal-roles",
    params(("principal_role" = String, Path, description = "Principal role name")),
    request_body = UpdateEntityRequest,
    responses(
        (status = 200, description = "Principal role updated", body = PrincipalRole),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_principal_role(
    Path(principal_role): Path<String>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdateEntityRequest>,
) -> Result<Json<PrincipalRole>, ApiError> {
    let update = EntityUpdate {
        properties: body.properties,
        expected_version: expected_version(&state, body.current_entity_version)?,
    };
    let role = state
        .store
        .update_principal_role(&principal_role, update)
        .await
        .map_err(|err| store_error("failed to update principal role", err))?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/management/v1/principal-roles/{principal_role}",
    tag = "principal-roles",
    params(("principal_role" = String, Path, description = "Principal role name"), VersionQuery),
    responses(
        (status = 204, description = "Principal role deleted with its assignments and bindings"),
        (status = 404, description = "Principal role not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_principal_role(
    Path(principal_role): Path<String>,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VersionQuery>,
) -> Result<StatusCode, ApiError> {
    let expected = expected_version(&state, query.current_entity_version)?;
    state
        .store
        .delete_principal_role(&principal_role, expected)
        .await
        .map_err(|err| store_error("failed to delete principal role", err))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/management/v1/principal-roles/{principal_role}/principals",
    tag = "principal-roles",
    params(("principal_role" = String, Path, description = "Principal role name")),
    responses(
        (status = 200, description = "Principals holding the role", body = PrincipalListResponse),
        (status = 404, description = "Principal role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_role_principals(
    Path(principal_role): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PrincipalListResponse>, ApiError> {
    let items = state
        .store
        .principals_for_principal_role(&principal_role)
        .await
        .map_err(|err| store_error("failed to list principals", err))?;
    Ok(Json(PrincipalListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/api/management/v1/principal-roles/{principal_role}/catalog-roles/{catalog}",
    tag = "principal-roles",
    params(
        ("principal_role" = String, Path, description = "Principal role name"),
        ("catalog" = String, Path, description = "Catalog name")
    ),
    responses(
        (status = 200, description = "Catalog roles bound in the catalog", body = CatalogRoleListResponse),
        (status = 404, description = "Principal role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_bound_catalog_roles(
    Path((principal_role, catalog)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<CatalogRoleListResponse>, ApiError> {
    let items = state
        .store
        .catalog_roles_for_principal_role(&principal_role, Some(&catalog))
        .await
        .map_err(|err| store_error("failed to list catalog roles", err))?;
    Ok(Json(CatalogRoleListResponse { items }))
}

#[utoipa::path(
    put,
    path = "/api/management/v1/principal-roles/{principal_role}/catalog-roles/{catalog}",
    tag = "principal-roles",
    params(
        ("principal_role" = String, Path, description = "Principal role name"),
        ("catalog" = String, Path, description = "Catalog name")
    ),
    request_body = BindCatalogRoleRequest,
    responses(
        (status = 200, description = "Catalog role bound; returns the principal role", body = PrincipalRole),
        (status = 404, description = "Principal role or catalog role not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn bind_catalog_role(
    Path((principal_role, catalog)): Path<(String, String)>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BindCatalogRoleRequest>,
) -> Result<Json<PrincipalRole>, ApiError> {
    let expected = expected_version(&state, body.current_entity_version)?;
    let key = CatalogRoleKey::new(catalog, body.catalog_role_name);
    let role = state
        .store
        .bind_catalog_role(&principal_role, &key, expected)
        .await
        .map_err(|err| store_error("failed to bind catalog role", err))?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/management/v1/principal-roles/{principal_role}/catalog-roles/{catalog}/{catalog_role}",
    tag = "principal-roles",
    params(
        ("principal_role" = String, Path, description = "Principal role name"),
        ("catalog" = String, Path, description = "Catalog name"),
        ("catalog_role" = String, Path, description = "Catalog role name"),
        VersionQuery
    ),
    responses(
        (status = 200, description = "Binding removed; returns the principal role", body = PrincipalRole),
        (status = 404, description = "Role or binding not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn unbind_catalog_role(
    Path((principal_role, catalog, catalog_role)): Path<(String, String, String)>,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VersionQuery>,
) -> Result<Json<PrincipalRole>, ApiError> {
    let expected = expected_version(&state, query.current_entity_version)?;
    let key = CatalogRoleKey::new(catalog, catalog_role);
    let role = state
        .store
        .unbind_catalog_role(&principal_role, &key, expected)
        .await
        .map_err(|err| store_error("failed to unbind catalog role", err))?;
    Ok(Json(role))
}
