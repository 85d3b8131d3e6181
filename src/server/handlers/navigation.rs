use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;

use super::ApiError;
use crate::database::entities::nav_nodes;
use crate::errors::NavError;
use crate::server::app::AppState;
use crate::services::{Actor, NavigationService, NewNode, NodePatch};
use crate::tree::NavNode;

/// Actor identity and client address riding on the request headers, consumed
/// by the audit step of every mutating endpoint.
pub struct ActorIdentity {
    pub actor: Actor,
    pub ip: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let mut actor = Actor::anonymous();
        if let Some(id) = header("x-user-id") {
            actor.id = id;
        }
        if let Some(name) = header("x-user-name") {
            actor.name = name;
        }
        Ok(Self {
            actor,
            ip: header("x-forwarded-for"),
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MoveRequest {
    /// Business key of the node to move.
    pub id: String,
    /// New parent's business key; absent moves to root.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReorderRequest {
    /// Parent business key; absent reorders the roots.
    #[serde(default)]
    pub parent: Option<String>,
    /// Child business keys in their new order.
    pub order: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/navigation",
    responses(
        (status = 200, description = "Full navigation tree", body = [NavNode]),
    )
)]
pub async fn get_navigation(
    State(state): State<AppState>,
) -> Result<Json<Vec<NavNode>>, ApiError> {
    let service = NavigationService::new(state.db.clone());
    match service.get_navigation().await {
        Ok(tree) => Ok(Json(tree)),
        Err(err @ (NavError::Unavailable(_) | NavError::Empty)) => {
            warn!("serving bundled navigation fallback: {}", err);
            Ok(Json(state.fallback.tree()))
        }
        Err(err) => Err(err.into()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/navigation",
    request_body = Vec<NavNode>,
    responses(
        (status = 204, description = "Stored tree now matches the submitted tree"),
        (status = 400, description = "Candidate tree failed validation"),
    )
)]
pub async fn sync_navigation(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Json(candidate): Json<Vec<NavNode>>,
) -> Result<StatusCode, ApiError> {
    let service = NavigationService::new(state.db.clone());
    service.sync_navigation(&candidate, &identity.actor).await?;
    state
        .audit
        .record(
            &identity.actor,
            "navigation.sync",
            Some(json!({ "nodes": candidate.len() })),
            identity.ip.as_deref(),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/navigation/nodes",
    request_body = NewNode,
    responses(
        (status = 200, description = "Node created"),
        (status = 400, description = "Duplicate key or invalid parent"),
        (status = 404, description = "Parent not found"),
    )
)]
pub async fn add_node(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Json(payload): Json<NewNode>,
) -> Result<Json<nav_nodes::Model>, ApiError> {
    let service = NavigationService::new(state.db.clone());
    let node = service.add_node(payload, &identity.actor).await?;
    state
        .audit
        .record(
            &identity.actor,
            "navigation.node_add",
            Some(json!({ "key": node.node_key })),
            identity.ip.as_deref(),
        )
        .await;
    Ok(Json(node))
}

#[utoipa::path(
    patch,
    path = "/api/v1/navigation/nodes/{key}",
    params(
        ("key" = String, Path, description = "Node business key")
    ),
    request_body = NodePatch,
    responses(
        (status = 200, description = "Node updated"),
        (status = 404, description = "Node not found"),
    )
)]
pub async fn update_node(
    State(state): State<AppState>,
    Path(key): Path<String>,
    identity: ActorIdentity,
    Json(patch): Json<NodePatch>,
) -> Result<Json<nav_nodes::Model>, ApiError> {
    let service = NavigationService::new(state.db.clone());
    let node = service.update_node(&key, patch, &identity.actor).await?;
    state
        .audit
        .record(
            &identity.actor,
            "navigation.node_update",
            Some(json!({ "key": key })),
            identity.ip.as_deref(),
        )
        .await;
    Ok(Json(node))
}

#[utoipa::path(
    delete,
    path = "/api/v1/navigation/nodes/{key}",
    params(
        ("key" = String, Path, description = "Node business key")
    ),
    responses(
        (status = 204, description = "Node deleted, descendants cascaded"),
        (status = 404, description = "Node not found"),
    )
)]
pub async fn delete_node(
    State(state): State<AppState>,
    Path(key): Path<String>,
    identity: ActorIdentity,
) -> Result<StatusCode, ApiError> {
    let service = NavigationService::new(state.db.clone());
    service.delete_node(&key).await?;
    state
        .audit
        .record(
            &identity.actor,
            "navigation.node_delete",
            Some(json!({ "key": key })),
            identity.ip.as_deref(),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/navigation/move",
    request_body = MoveRequest,
    responses(
        (status = 200, description = "Node re-parented"),
        (status = 404, description = "Node or parent not found"),
        (status = 400, description = "Move would detach the subtree"),
    )
)]
pub async fn move_node(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Json(payload): Json<MoveRequest>,
) -> Result<Json<nav_nodes::Model>, ApiError> {
    let service = NavigationService::new(state.db.clone());
    let node = service
        .move_node(
            &payload.id,
            payload.parent.as_deref(),
            payload.sort_order,
            &identity.actor,
        )
        .await?;
    state
        .audit
        .record(
            &identity.actor,
            "navigation.node_move",
            Some(json!({ "key": payload.id, "parent": payload.parent })),
            identity.ip.as_deref(),
        )
        .await;
    Ok(Json(node))
}

#[utoipa::path(
    post,
    path = "/api/v1/navigation/reorder",
    request_body = ReorderRequest,
    responses(
        (status = 204, description = "Sibling order reassigned"),
        (status = 404, description = "Parent or child key not found"),
    )
)]
pub async fn reorder_children(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Json(payload): Json<ReorderRequest>,
) -> Result<StatusCode, ApiError> {
    let service = NavigationService::new(state.db.clone());
    service
        .reorder_children(payload.parent.as_deref(), &payload.order, &identity.actor)
        .await?;
    state
        .audit
        .record(
            &identity.actor,
            "navigation.reorder",
            Some(json!({ "parent": payload.parent, "order": payload.order })),
            identity.ip.as_deref(),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
