//! In-memory navigation tree model.
//!
//! The navigation menu is stored as normalized rows (integer surrogate ids,
//! string business keys, nullable parent pointers) but travels over the API as
//! a nested tree. This module holds the tree form plus the two conversions:
//! `flatten` for writing and `build_tree` for reading. Both are pure so they
//! can be exercised without a database.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{NavError, NavResult};

/// Sort order assigned to nodes added without explicit placement. Large so
/// appended nodes land after any explicitly ordered siblings; clients needing
/// precise placement follow up with a reorder.
pub const APPEND_SORT_ORDER: i32 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    Module,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::Module => "module",
        }
    }

    /// Stored rows are only ever written by this crate; anything unexpected
    /// degrades to a leaf rather than failing the whole read.
    pub fn from_db(value: &str) -> Self {
        match value {
            "folder" => NodeKind::Folder,
            _ => NodeKind::Module,
        }
    }

    pub fn default_icon(&self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::Module => "file-text",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Draft,
    Ready,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Draft => "draft",
            NodeStatus::Ready => "ready",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "ready" => NodeStatus::Ready,
            _ => NodeStatus::Draft,
        }
    }
}

/// One entry in the navigation tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NavNode {
    /// Business key, unique across the whole tree.
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_zh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Present iff `kind == folder`; child order defines sibling sort order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NavNode>>,
}

/// One node of a candidate tree in flattened, write-ready form.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatNode {
    pub key: String,
    pub parent_key: Option<String>,
    pub sort_order: i32,
    pub label: String,
    pub label_zh: Option<String>,
    pub description: Option<String>,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub icon: Option<String>,
}

/// One stored row in read-ready form, decoupled from the database entity so
/// tree reconstruction stays testable in isolation.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeRow {
    pub id: i32,
    pub key: String,
    pub parent_id: Option<i32>,
    pub label: String,
    pub label_zh: Option<String>,
    pub description: Option<String>,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub icon: Option<String>,
}

/// Validate a candidate tree once at the boundary: business keys must be
/// non-empty and unique across the whole tree, and modules must be leaves.
pub fn validate(nodes: &[NavNode]) -> NavResult<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    validate_level(nodes, &mut seen)
}

fn validate_level<'a>(nodes: &'a [NavNode], seen: &mut HashSet<&'a str>) -> NavResult<()> {
    for node in nodes {
        if node.id.trim().is_empty() {
            return Err(NavError::Validation(
                "node business key must not be empty".to_string(),
            ));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(NavError::DuplicateKey(node.id.clone()));
        }
        match node.kind {
            NodeKind::Module => {
                if node.children.as_ref().is_some_and(|c| !c.is_empty()) {
                    return Err(NavError::Validation(format!(
                        "module '{}' cannot have children",
                        node.id
                    )));
                }
            }
            NodeKind::Folder => {
                if let Some(children) = &node.children {
                    validate_level(children, seen)?;
                }
            }
        }
    }
    Ok(())
}

/// Depth-first flatten: parents precede their children, and each node's index
/// among its siblings becomes its `sort_order`.
pub fn flatten(nodes: &[NavNode]) -> Vec<FlatNode> {
    let mut out = Vec::new();
    flatten_level(nodes, None, &mut out);
    out
}

fn flatten_level(nodes: &[NavNode], parent_key: Option<&str>, out: &mut Vec<FlatNode>) {
    for (index, node) in nodes.iter().enumerate() {
        out.push(FlatNode {
            key: node.id.clone(),
            parent_key: parent_key.map(str::to_string),
            sort_order: index as i32,
            label: node.label.clone(),
            label_zh: node.label_zh.clone(),
            description: node.description.clone(),
            kind: node.kind,
            status: node.status,
            icon: node.icon.clone(),
        });
        if let Some(children) = &node.children {
            flatten_level(children, Some(&node.id), out);
        }
    }
}

/// Rebuild the nested tree from stored rows. Rows must already be sorted by
/// `sort_order` (then id); attachment order preserves that ordering.
///
/// Rows whose parent cannot be resolved, or whose parent turns out to be a
/// module, become additional roots instead of being dropped.
pub fn build_tree(rows: &[TreeRow]) -> Vec<NavNode> {
    let index_by_id: HashMap<i32, usize> =
        rows.iter().enumerate().map(|(i, row)| (row.id, i)).collect();

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots: Vec<usize> = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let parent_index = row
            .parent_id
            .and_then(|pid| index_by_id.get(&pid).copied())
            .filter(|&pi| rows[pi].kind == NodeKind::Folder);
        match parent_index {
            Some(pi) => children_of[pi].push(index),
            None => roots.push(index),
        }
    }

    roots
        .iter()
        .map(|&index| build_node(rows, &children_of, index))
        .collect()
}

fn build_node(rows: &[TreeRow], children_of: &[Vec<usize>], index: usize) -> NavNode {
    let row = &rows[index];
    let children = match row.kind {
        NodeKind::Folder => Some(
            children_of[index]
                .iter()
                .map(|&child| build_node(rows, children_of, child))
                .collect(),
        ),
        NodeKind::Module => None,
    };
    NavNode {
        id: row.key.clone(),
        label: row.label.clone(),
        label_zh: row.label_zh.clone(),
        description: row.description.clone(),
        kind: row.kind,
        status: row.status,
        icon: row.icon.clone(),
        children,
    }
}

/// Bundled default tree served when the store is unreachable or empty.
pub fn bundled_default() -> Vec<NavNode> {
    fn module(id: &str, label: &str, label_zh: &str) -> NavNode {
        NavNode {
            id: id.to_string(),
            label: label.to_string(),
            label_zh: Some(label_zh.to_string()),
            description: None,
            kind: NodeKind::Module,
            status: NodeStatus::Ready,
            icon: Some(NodeKind::Module.default_icon().to_string()),
            children: None,
        }
    }

    vec![
        NavNode {
            icon: Some("home".to_string()),
            ..module("home", "Home", "首页")
        },
        NavNode {
            id: "requirements".to_string(),
            label: "Requirements".to_string(),
            label_zh: Some("需求管理".to_string()),
            description: None,
            kind: NodeKind::Folder,
            status: NodeStatus::Ready,
            icon: Some(NodeKind::Folder.default_icon().to_string()),
            children: Some(vec![
                module("feature_list", "Feature List", "功能清单"),
                module("business_rules", "Business Rules", "业务规则"),
            ]),
        },
    ]
}
