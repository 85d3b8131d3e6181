use anyhow::Result;
use axum::{
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use super::handlers::{health, navigation};
use crate::services::{AuditService, FallbackNavigation};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub audit: AuditService,
    pub fallback: FallbackNavigation,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        navigation::get_navigation,
        navigation::sync_navigation,
        navigation::add_node,
        navigation::update_node,
        navigation::delete_node,
        navigation::move_node,
        navigation::reorder_children,
    ),
    components(schemas(
        crate::tree::NavNode,
        crate::tree::NodeKind,
        crate::tree::NodeStatus,
        crate::services::NewNode,
        crate::services::NodePatch,
        navigation::MoveRequest,
        navigation::ReorderRequest,
    ))
)]
struct ApiDoc;

pub async fn create_app(db: DatabaseConnection, cors_origin: Option<&str>) -> Result<Router> {
    let state = AppState {
        audit: AuditService::new(db.clone()),
        fallback: FallbackNavigation::bundled(),
        db,
    };

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api/v1", api_v1_routes())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/navigation", get(navigation::get_navigation))
        .route("/navigation", post(navigation::sync_navigation))
        .route("/navigation/nodes", post(navigation::add_node))
        .route("/navigation/nodes/:key", patch(navigation::update_node))
        .route("/navigation/nodes/:key", delete(navigation::delete_node))
        .route("/navigation/move", post(navigation::move_node))
        .route("/navigation/reorder", post(navigation::reorder_children))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
