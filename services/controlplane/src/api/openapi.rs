//! OpenAPI document for the management API.
use crate::api::{
    catalog_roles, grants, principal_roles, principals, system,
    types::{
        AddGrantRequest, AssignPrincipalRoleRequest, BindCatalogRoleRequest,
        CatalogRoleListResponse, CreateCatalogRoleRequest, CreatePrincipalRequest,
        CreatePrincipalRoleRequest, ErrorResponse, GrantListResponse, GrantSearchRequest,
        HealthStatus, PrincipalListResponse, PrincipalRoleListResponse, RevokeGrantRequest,
        RevokeGrantResponse, SystemInfo, UpdateEntityRequest,
    },
};
use crate::model::{CatalogRole, Grant, GrantEntry, Principal, PrincipalRole};
use lattice_authz::{Privilege, Resource};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "lattice-controlplane",
        version = "v1",
        description = "Principals, roles and grants for lattice access control"
    ),
    paths(
        system::system_info,
        system::system_health,
        principals::list_principals,
        principals::create_principal,
        principals::get_principal,
        principals::update_principal,
        principals::delete_principal,
        principals::list_assigned_principal_roles,
        principals::assign_principal_role,
        principals::revoke_principal_role,
        principals::effective_catalog_roles,
        principal_roles::list_principal_roles,
        principal_roles::create_principal_role,
        principal_roles::get_principal_role,
        principal_roles::update_principal_role,
        principal_roles::delete_principal_role,
        principal_roles::list_role_principals,
        principal_roles::list_bound_catalog_roles,
        principal_roles::bind_catalog_role,
        principal_roles::unbind_catalog_role,
        catalog_roles::list_catalog_roles,
        catalog_roles::create_catalog_role,
        catalog_roles::get_catalog_role,
        catalog_roles::update_catalog_role,
        catalog_roles::delete_catalog_role,
        catalog_roles::list_bound_principal_roles,
        grants::list_grants,
        grants::add_grant,
        grants::revoke_grant,
        grants::search_grants
    ),
    components(schemas(
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        Principal,
        PrincipalRole,
        CatalogRole,
        Resource,
        Privilege,
        Grant,
        GrantEntry,
        CreatePrincipalRequest,
        CreatePrincipalRoleRequest,
        CreateCatalogRoleRequest,
        UpdateEntityRequest,
        AssignPrincipalRoleRequest,
        BindCatalogRoleRequest,
        AddGrantRequest,
        RevokeGrantRequest,
        RevokeGrantResponse,
        GrantSearchRequest,
        PrincipalListResponse,
        PrincipalRoleListResponse,
        CatalogRoleListResponse,
        GrantListResponse
    )),
    tags(
        (name = "system", description = "Service identity and health"),
        (name = "principals", description = "Principals and their role assignments"),
        (name = "principal-roles", description = "Principal roles and catalog role bindings"),
        (name = "catalog-roles", description = "Catalog-scoped roles"),
        (name = "grants", description = "Privileges granted to catalog roles")
    )
)]
pub struct ApiDoc;
