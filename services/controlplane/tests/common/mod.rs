use lattice_controlplane::app::{AppState, build_router};
use lattice_controlplane::store::memory::InMemoryStore;
use std::sync::Arc;

pub type TestApp = axum::routing::RouterIntoService<axum::body::Body, ()>;

pub fn memory_app(admin_token: Option<&str>, require_entity_version: bool) -> TestApp {
    let state = AppState {
        api_version: "v1".to_string(),
        store: Arc::new(InMemoryStore::new()),
        admin_token: admin_token.map(str::to_string),
        require_entity_version,
    };
    build_router(state).into_service()
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
