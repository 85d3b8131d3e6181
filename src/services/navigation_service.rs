//! Navigation tree reads, full-tree synchronization and single-node edits.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::database::entities::nav_nodes::{self, Entity as NavNodes};
use crate::errors::{NavError, NavResult};
use crate::tree::{self, NavNode, NodeKind, NodeStatus, TreeRow, APPEND_SORT_ORDER};

use super::audit_service::Actor;

/// Bundled default tree, constructed once at startup and handed to whatever
/// needs a store-unavailable fallback.
#[derive(Clone)]
pub struct FallbackNavigation {
    tree: Arc<Vec<NavNode>>,
}

impl FallbackNavigation {
    pub fn bundled() -> Self {
        Self {
            tree: Arc::new(tree::bundled_default()),
        }
    }

    pub fn tree(&self) -> Vec<NavNode> {
        self.tree.as_ref().clone()
    }
}

/// Payload for adding a single node without a full-tree submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewNode {
    /// Business key, unique across the tree.
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub label_zh: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub status: Option<NodeStatus>,
    #[serde(default)]
    pub icon: Option<String>,
    /// Parent business key; absent for a root node.
    #[serde(default)]
    pub parent: Option<String>,
}

/// Partial patch; unspecified fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NodePatch {
    pub label: Option<String>,
    pub label_zh: Option<String>,
    pub description: Option<String>,
    pub status: Option<NodeStatus>,
    pub icon: Option<String>,
}

pub struct NavigationService {
    db: DatabaseConnection,
}

impl NavigationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetch all rows and rebuild the nested tree.
    ///
    /// Distinguishes an unreachable store (`Unavailable`) from a reachable but
    /// empty one (`Empty`) so callers can decide whether to fall back to the
    /// bundled default tree. Rows with an unresolvable parent come back as
    /// extra roots rather than being dropped.
    pub async fn get_navigation(&self) -> NavResult<Vec<NavNode>> {
        let rows = NavNodes::find()
            .order_by_asc(nav_nodes::Column::SortOrder)
            .order_by_asc(nav_nodes::Column::Id)
            .all(&self.db)
            .await
            .map_err(NavError::Unavailable)?;

        if rows.is_empty() {
            return Err(NavError::Empty);
        }

        let rows: Vec<TreeRow> = rows.into_iter().map(row_to_tree_row).collect();
        Ok(tree::build_tree(&rows))
    }

    /// Make stored state match the candidate tree exactly.
    ///
    /// Stale rows are deleted first so a business key removed in this batch
    /// can be reused elsewhere in the same batch. Content is then upserted by
    /// business key (pass 1), and parent pointers are re-linked from the
    /// generated ids (pass 2) since a parent row must exist before a child can
    /// reference it. The whole reconciliation runs in one transaction; any
    /// failure rolls it back.
    pub async fn sync_navigation(&self, candidate: &[NavNode], actor: &Actor) -> NavResult<()> {
        tree::validate(candidate)?;
        let flat = tree::flatten(candidate);
        debug!("synchronizing navigation tree: {} nodes", flat.len());

        let txn = self.db.begin().await?;

        // Snapshot before deleting: rows removed by the folder cascade may
        // reappear in the candidate under a new parent, and their original
        // authorship must survive.
        let snapshot: HashMap<String, nav_nodes::Model> = NavNodes::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|row| (row.node_key.clone(), row))
            .collect();

        let candidate_keys: HashSet<&str> = flat.iter().map(|node| node.key.as_str()).collect();
        let stale: Vec<String> = snapshot
            .keys()
            .filter(|key| !candidate_keys.contains(key.as_str()))
            .cloned()
            .collect();

        if !stale.is_empty() {
            debug!("removing {} stale navigation nodes", stale.len());
            NavNodes::delete_many()
                .filter(nav_nodes::Column::NodeKey.is_in(stale))
                .exec(&txn)
                .await?;
        }

        let surviving: HashMap<String, nav_nodes::Model> = NavNodes::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|row| (row.node_key.clone(), row))
            .collect();

        let now = Utc::now();
        let mut ids: HashMap<&str, i32> = HashMap::new();

        // Pass 1: content by business key, no parent linkage yet.
        for node in &flat {
            let id = match surviving.get(&node.key) {
                Some(row) => {
                    // created_by stays untouched so authorship survives resyncs
                    let mut active: nav_nodes::ActiveModel = row.clone().into();
                    active.label = Set(node.label.clone());
                    active.label_zh = Set(node.label_zh.clone());
                    active.description = Set(node.description.clone());
                    active.kind = Set(node.kind.as_str().to_string());
                    active.status = Set(node.status.as_str().to_string());
                    active.icon = Set(node.icon.clone());
                    active.sort_order = Set(node.sort_order);
                    active.updated_by = Set(Some(actor.id.clone()));
                    active.updated_at = Set(now);
                    active.update(&txn).await?.id
                }
                None => {
                    let created_by = snapshot
                        .get(&node.key)
                        .and_then(|row| row.created_by.clone())
                        .unwrap_or_else(|| actor.id.clone());
                    let active = nav_nodes::ActiveModel {
                        node_key: Set(node.key.clone()),
                        parent_id: Set(None),
                        label: Set(node.label.clone()),
                        label_zh: Set(node.label_zh.clone()),
                        description: Set(node.description.clone()),
                        kind: Set(node.kind.as_str().to_string()),
                        status: Set(node.status.as_str().to_string()),
                        icon: Set(node.icon.clone()),
                        sort_order: Set(node.sort_order),
                        created_by: Set(Some(created_by)),
                        updated_by: Set(Some(actor.id.clone())),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    };
                    active.insert(&txn).await?.id
                }
            };
            ids.insert(node.key.as_str(), id);
        }

        // Pass 2: parent linkage; explicitly null for roots so a node moved
        // from non-root to root is unlinked.
        for node in &flat {
            let parent_id = match node.parent_key.as_deref() {
                Some(parent_key) => Some(*ids.get(parent_key).ok_or_else(|| {
                    NavError::Validation(format!("unresolved parent '{}'", parent_key))
                })?),
                None => None,
            };
            let active = nav_nodes::ActiveModel {
                id: Set(ids[node.key.as_str()]),
                parent_id: Set(parent_id),
                ..Default::default()
            };
            active.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Insert a single node at the end of its parent's children.
    pub async fn add_node(&self, req: NewNode, actor: &Actor) -> NavResult<nav_nodes::Model> {
        if req.id.trim().is_empty() {
            return Err(NavError::Validation(
                "node business key must not be empty".to_string(),
            ));
        }

        if self.find_by_key(&req.id).await?.is_some() {
            return Err(NavError::DuplicateKey(req.id));
        }

        let parent_id = match req.parent.as_deref() {
            Some(parent_key) => Some(self.resolve_folder(parent_key).await?.id),
            None => None,
        };

        let now = Utc::now();
        let status = req.status.unwrap_or_default();
        let icon = req
            .icon
            .unwrap_or_else(|| req.kind.default_icon().to_string());

        let node = nav_nodes::ActiveModel {
            node_key: Set(req.id),
            parent_id: Set(parent_id),
            label: Set(req.label),
            label_zh: Set(req.label_zh),
            description: Set(req.description),
            kind: Set(req.kind.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            icon: Set(Some(icon)),
            sort_order: Set(APPEND_SORT_ORDER),
            created_by: Set(Some(actor.id.clone())),
            updated_by: Set(Some(actor.id.clone())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(node.insert(&self.db).await?)
    }

    /// Merge-patch a node's content fields by business key.
    pub async fn update_node(
        &self,
        key: &str,
        patch: NodePatch,
        actor: &Actor,
    ) -> NavResult<nav_nodes::Model> {
        let node = self
            .find_by_key(key)
            .await?
            .ok_or_else(|| NavError::NodeNotFound(key.to_string()))?;

        let mut active: nav_nodes::ActiveModel = node.into();
        if let Some(label) = patch.label {
            active.label = Set(label);
        }
        if let Some(label_zh) = patch.label_zh {
            active.label_zh = Set(Some(label_zh));
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(status) = patch.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(icon) = patch.icon {
            active.icon = Set(Some(icon));
        }
        active.updated_by = Set(Some(actor.id.clone()));
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    /// Delete a node by business key. Descendants go with it through the
    /// parent foreign key's ON DELETE CASCADE.
    pub async fn delete_node(&self, key: &str) -> NavResult<()> {
        let node = self
            .find_by_key(key)
            .await?
            .ok_or_else(|| NavError::NodeNotFound(key.to_string()))?;

        NavNodes::delete_by_id(node.id).exec(&self.db).await?;
        Ok(())
    }

    /// Re-parent a node, optionally placing it at an explicit sort position.
    pub async fn move_node(
        &self,
        key: &str,
        new_parent: Option<&str>,
        sort_order: Option<i32>,
        actor: &Actor,
    ) -> NavResult<nav_nodes::Model> {
        let node = self
            .find_by_key(key)
            .await?
            .ok_or_else(|| NavError::NodeNotFound(key.to_string()))?;

        let parent_id = match new_parent {
            Some(parent_key) => {
                if parent_key == key {
                    return Err(NavError::Validation(format!(
                        "cannot move '{}' under itself",
                        key
                    )));
                }
                let parent = self.resolve_folder(parent_key).await?;
                self.ensure_not_descendant(node.id, &parent).await?;
                Some(parent.id)
            }
            None => None,
        };

        let mut active: nav_nodes::ActiveModel = node.into();
        active.parent_id = Set(parent_id);
        active.sort_order = Set(sort_order.unwrap_or(APPEND_SORT_ORDER));
        active.updated_by = Set(Some(actor.id.clone()));
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    /// Reassign `sort_order = 0..n-1` over an explicit ordered key list.
    ///
    /// One update per key; concurrent reorders on the same parent are not
    /// serialized against each other (last write wins per row).
    pub async fn reorder_children(
        &self,
        parent: Option<&str>,
        ordered_keys: &[String],
        actor: &Actor,
    ) -> NavResult<()> {
        if let Some(parent_key) = parent {
            self.resolve_folder(parent_key).await?;
        }

        let now = Utc::now();
        for (position, key) in ordered_keys.iter().enumerate() {
            let node = self
                .find_by_key(key)
                .await?
                .ok_or_else(|| NavError::NodeNotFound(key.clone()))?;
            let mut active: nav_nodes::ActiveModel = node.into();
            active.sort_order = Set(position as i32);
            active.updated_by = Set(Some(actor.id.clone()));
            active.updated_at = Set(now);
            active.update(&self.db).await?;
        }
        Ok(())
    }

    async fn find_by_key(&self, key: &str) -> NavResult<Option<nav_nodes::Model>> {
        Ok(NavNodes::find()
            .filter(nav_nodes::Column::NodeKey.eq(key))
            .one(&self.db)
            .await?)
    }

    /// Resolve a parent business key to its row, requiring it to be a folder.
    async fn resolve_folder(&self, parent_key: &str) -> NavResult<nav_nodes::Model> {
        let parent = self
            .find_by_key(parent_key)
            .await?
            .ok_or_else(|| NavError::ParentNotFound(parent_key.to_string()))?;
        if NodeKind::from_db(&parent.kind) != NodeKind::Folder {
            return Err(NavError::Validation(format!(
                "parent '{}' is not a folder",
                parent_key
            )));
        }
        Ok(parent)
    }

    /// Walk the new parent's ancestor chain; moving a node under its own
    /// descendant would detach the subtree from every root.
    async fn ensure_not_descendant(
        &self,
        node_id: i32,
        new_parent: &nav_nodes::Model,
    ) -> NavResult<()> {
        if new_parent.id == node_id {
            return Err(NavError::Validation(
                "cannot move a node under itself".to_string(),
            ));
        }
        let mut cursor = new_parent.parent_id;
        while let Some(ancestor_id) = cursor {
            if ancestor_id == node_id {
                return Err(NavError::Validation(
                    "cannot move a node under its own descendant".to_string(),
                ));
            }
            cursor = NavNodes::find_by_id(ancestor_id)
                .one(&self.db)
                .await?
                .and_then(|row| row.parent_id);
        }
        Ok(())
    }
}

fn row_to_tree_row(row: nav_nodes::Model) -> TreeRow {
    TreeRow {
        id: row.id,
        key: row.node_key,
        parent_id: row.parent_id,
        label: row.label,
        label_zh: row.label_zh,
        description: row.description,
        kind: NodeKind::from_db(&row.kind),
        status: NodeStatus::from_db(&row.status),
        icon: row.icon,
    }
}
