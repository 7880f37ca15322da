//! Principal API handlers.
//!
//! # Purpose
//! CRUD for principals, their principal-role assignments, and the effective
//! catalog roles reachable through those assignments.
use crate::api::error::{ApiError, store_error};
use crate::api::{ApiJson, ApiQuery, expected_version};
use crate::api::types::{
    AssignPrincipalRoleRequest, CatalogRoleListResponse, CreatePrincipalRequest,
    PrincipalListResponse, PrincipalRoleListResponse, UpdateEntityRequest, VersionQuery,
};
use crate::app::AppState;
use crate::model::{EntityUpdate, Principal};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/api/management/v1/principals",
    tag = "principals",
    responses(
        (status = 200, description = "List principals", body = PrincipalListResponse)
    )
)]
pub(crate) async fn list_principals(
    State(state): State<AppState>,
) -> Result<Json<PrincipalListResponse>, ApiError> {
    let items = state
        .store
        .list_principals()
        .await
        .map_err(|err| store_error("failed to list principals", err))?;
    Ok(Json(PrincipalListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/management/v1/principals",
    tag = "principals",
    request_body = CreatePrincipalRequest,
    responses(
        (status = 201, description = "Principal created", body = Principal),
        (status = 400, description = "Invalid name", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Principal already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_principal(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreatePrincipalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = state
        .store
        .create_principal(Principal::new(body.name, body.properties))
        .await
        .map_err(|err| store_error("failed to create principal", err))?;
    Ok((StatusCode::CREATED, Json(principal)))
}

#[utoipa::path(
    get,
    path = "/api/management/v1/principals/{principal}",
    tag = "principals",
    params(("principal" = String, Path, description = "Principal name")),
    responses(
        (status = 200, description = "Principal", body = Principal),
        (status = 404, description = "Principal not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_principal(
    Path(principal): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Principal>, ApiError> {
    let principal = state
        .store
        .get_principal(&principal)
        .await
        .map_err(|err| store_error("failed to load principal", err))?;
    Ok(Json(principal))
}

#[utoipa::path(
    put,
    path = "/api/management/v1/principals/{principal}",
    tag = "principals",
    params(("principal" = String, Path, description = "Principal name")),
    request_body = UpdateEntityRequest,
    responses(
        (status = 200, description = "Principal updated", body = Principal),
        (status = 404, description = "Principal not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_principal(
    Path(principal): Path<String>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdateEntityRequest>,
) -> Result<Json<Principal>, ApiError> {
    let update = EntityUpdate {
        properties: body.properties,
        expected_version: expected_version(&state, body.current_entity_version)?,
    };
    let principal = state
        .store
        .update_principal(&principal, update)
        .await
        .map_err(|err| store_error("failed to update principal", err))?;
    Ok(Json(principal))
}

#[utoipa::path(
    delete,
    path = "/api/management/v1/principals/{principal}",
    tag = "principals",
    params(("principal" = String, Path, description = "Principal name"), VersionQuery),
    responses(
        (status = 204, description = "Principal deleted"),
        (status = 404, description = "Principal not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_principal(
    Path(principal): Path<String>,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VersionQuery>,
) -> Result<StatusCode, ApiError> {
    let expected = expected_version(&state, query.current_entity_version)?;
    state
        .store
        .delete_principal(&principal, expected)
        .await
        .map_err(|err| store_error("failed to delete principal", err))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/management/v1/principals/{principal}/principal-roles",
    tag = "principals",
    params(("principal" = String, Path, description = "Principal name")),
    responses(
        (status = 200, description = "Assigned principal roles", body = PrincipalRoleListResponse),
        (status = 404, description = "Principal not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_assigned_principal_roles(
    Path(principal): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PrincipalRoleListResponse>, ApiError> {
    let items = state
        .store
        .principal_roles_for_principal(&principal)
        .await
        .map_err(|err| store_error("failed to list principal roles", err))?;
    Ok(Json(PrincipalRoleListResponse { items }))
}

#[utoipa::path(
    put,
    path = "/api/management/v1/principals/{principal}/principal-roles",
    tag = "principals",
    params(("principal" = String, Path, description = "Principal name")),
    request_body = AssignPrincipalRoleRequest,
    responses(
        (status = 200, description = "Role assigned; returns the principal", body = Principal),
        (status = 404, description = "Principal or principal role not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn assign_principal_role(
    Path(principal): Path<String>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AssignPrincipalRoleRequest>,
) -> Result<Json<Principal>, ApiError> {
    let expected = expected_version(&state, body.current_entity_version)?;
    let principal = state
        .store
        .assign_principal_role(&principal, &body.principal_role_name, expected)
        .await
        .map_err(|err| store_error("failed to assign principal role", err))?;
    Ok(Json(principal))
}

#[utoipa::path(
    delete,
    path = "/api/management/v1/principals/{principal}/principal-roles/{principal_role}",
    tag = "principals",
    params(
        ("principal" = String, Path, description = "Principal name"),
        ("principal_role" = String, Path, description = "Principal role name"),
        VersionQuery
    ),
    responses(
        (status = 200, description = "Assignment removed; returns the principal", body = Principal),
        (status = 404, description = "Principal, role or assignment not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Stale entity version", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn revoke_principal_role(
    Path((principal, principal_role)): Path<(String, String)>,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VersionQuery>,
) -> Result<Json<Principal>, ApiError> {
    let expected = expected_version(&state, query.current_entity_version)?;
    let principal = state
        .store
        .revoke_principal_role(&principal, &principal_role, expected)
        .await
        .map_err(|err| store_error("failed to revoke principal role", err))?;
    Ok(Json(principal))
}

#[utoipa::path(
    get,
    path = "/api/management/v1/principals/{principal}/catalog-roles",
    tag = "principals",
    params(("principal" = String, Path, description = "Principal name")),
    responses(
        (status = 200, description = "Catalog roles reachable through assigned principal roles", body = CatalogRoleListResponse),
        (status = 404, description = "Principal not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn effective_catalog_roles(
    Path(principal): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CatalogRoleListResponse>, ApiError> {
    let items = state
        .store
        .effective_catalog_roles(&principal)
        .await
        .map_err(|err| store_error("failed to resolve catalog roles", err))?;
    Ok(Json(CatalogRoleListResponse { items }))
}
