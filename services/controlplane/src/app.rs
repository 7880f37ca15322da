//! Control-plane HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! System routes stay outside the admin token guard so probes work without
//! credentials. Everything else under `/api/management/v1` is guarded.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::observability;
use crate::store::AccessStore;
use axum::Router;
use axum::routing::{delete, get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub store: Arc<dyn AccessStore>,
    pub admin_token: Option<String>,
    pub require_entity_version: bool,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let management = Router::new()
        .route(
            "/api/management/v1/principals",
            get(api::principals::list_principals).post(api::principals::create_principal),
        )
        .route(
            "/api/management/v1/principals/:principal",
            get(api::principals::get_principal)
                .put(api::principals::update_principal)
                .delete(api::principals::delete_principal),
        )
        .route(
            "/api/management/v1/principals/:principal/principal-roles",
            get(api::principals::list_assigned_principal_roles)
                .put(api::principals::assign_principal_role),
        )
        .route(
            "/api/management/v1/principals/:principal/principal-roles/:principal_role",
            delete(api::principals::revoke_principal_role),
        )
        .route(
            "/api/management/v1/principals/:principal/catalog-roles",
            get(api::principals::effective_catalog_roles),
        )
        .route(
            "/api/management/v1/principal-roles",
            get(api::principal_roles::list_principal_roles)
                .post(api::principal_roles::create_principal_role),
        )
        .route(
            "/api/management/v1/principal-roles/:principal_role",
            get(api::principal_roles::get_principal_role)
                .put(api::principal_roles::update_principal_role)
                .delete(api::principal_roles::delete_principal_role),
        )
        .route(
            "/api/management/v1/principal-roles/:principal_role/principals",
            get(api::principal_roles::list_role_principals),
        )
        .route(
            "/api/management/v1/principal-roles/:principal_role/catalog-roles/:catalog",
            get(api::principal_roles::list_bound_catalog_roles)
                .put(api::principal_roles::bind_catalog_role),
        )
        .route(
            "/api/management/v1/principal-roles/:principal_role/catalog-roles/:catalog/:catalog_role",
            delete(api::principal_roles::unbind_catalog_role),
        )
        .route(
            "/api/management/v1/catalogs/:catalog/catalog-roles",
            get(api::catalog_roles::list_catalog_roles)
                .post(api::catalog_roles::create_catalog_role),
        )
        .route(
            "/api/management/v1/catalogs/:catalog/catalog-roles/:catalog_role",
            get(api::catalog_roles::get_catalog_role)
                .put(api::catalog_roles::update_catalog_role)
                .delete(api::catalog_roles::delete_catalog_role),
        )
        .route(
            "/api/management/v1/catalogs/:catalog/catalog-roles/:catalog_role/principal-roles",
            get(api::catalog_roles::list_bound_principal_roles),
        )
        .route(
            "/api/management/v1/catalogs/:catalog/catalog-roles/:catalog_role/grants",
            get(api::grants::list_grants).put(api::grants::add_grant),
        )
        .route(
            "/api/management/v1/catalogs/:catalog/catalog-roles/:catalog_role/grants/revoke",
            post(api::grants::revoke_grant),
        )
        .route(
            "/api/management/v1/catalogs/:catalog/grants/search",
            post(api::grants::search_grants),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api::require_admin,
        ));

    Router::new()
        .route(
            "/api/management/v1/system/info",
            get(api::system::system_info),
        )
        .route(
            "/api/management/v1/system/health",
            get(api::system::system_health),
        )
        .merge(management)
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs")
                .url("/api/management/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
