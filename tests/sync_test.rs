//! Navigation tree reconciliation tests
//!
//! Service-level tests for full-tree synchronization, atomic node operations
//! and the error taxonomy, run against throwaway sqlite databases.

use anyhow::Result;
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter};
use tempfile::NamedTempFile;

use tengine::database::connection::setup_database;
use tengine::database::entities::nav_nodes;
use tengine::errors::NavError;
use tengine::services::{Actor, NavigationService, NewNode, NodePatch};
use tengine::tree::{NavNode, NodeKind, NodeStatus, APPEND_SORT_ORDER};

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

fn actor() -> Actor {
    Actor {
        id: "u-100".to_string(),
        name: "Alice".to_string(),
    }
}

fn leaf(id: &str) -> NavNode {
    NavNode {
        id: id.to_string(),
        label: id.to_string(),
        label_zh: None,
        description: None,
        kind: NodeKind::Module,
        status: NodeStatus::Draft,
        icon: None,
        children: None,
    }
}

fn folder(id: &str, children: Vec<NavNode>) -> NavNode {
    NavNode {
        id: id.to_string(),
        label: id.to_string(),
        label_zh: None,
        description: None,
        kind: NodeKind::Folder,
        status: NodeStatus::Draft,
        icon: None,
        children: Some(children),
    }
}

async fn stored_keys(db: &DatabaseConnection) -> Result<Vec<String>> {
    let mut keys: Vec<String> = nav_nodes::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.node_key)
        .collect();
    keys.sort();
    Ok(keys)
}

async fn find_row(db: &DatabaseConnection, key: &str) -> Result<nav_nodes::Model> {
    nav_nodes::Entity::find()
        .filter(nav_nodes::Column::NodeKey.eq(key))
        .one(db)
        .await?
        .ok_or_else(|| anyhow::anyhow!("row '{}' missing", key))
}

#[tokio::test]
async fn test_sync_from_empty_store() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    let tree = vec![leaf("home"), folder("product", vec![leaf("prod_item")])];
    service.sync_navigation(&tree, &actor()).await?;

    assert_eq!(stored_keys(&db).await?, vec!["home", "prod_item", "product"]);

    let product = find_row(&db, "product").await?;
    assert_eq!(product.parent_id, None);

    let prod_item = find_row(&db, "prod_item").await?;
    assert_eq!(prod_item.parent_id, Some(product.id));

    let rebuilt = service.get_navigation().await?;
    assert_eq!(rebuilt, tree);

    Ok(())
}

#[tokio::test]
async fn test_resync_deletes_omitted_subtree() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    let tree = vec![leaf("home"), folder("product", vec![leaf("prod_item")])];
    service.sync_navigation(&tree, &actor()).await?;

    service.sync_navigation(&[leaf("home")], &actor()).await?;

    assert_eq!(stored_keys(&db).await?, vec!["home"]);
    assert_eq!(service.get_navigation().await?, vec![leaf("home")]);

    Ok(())
}

#[tokio::test]
async fn test_sync_is_idempotent() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    let tree = vec![
        folder("docs", vec![leaf("readme"), leaf("faq")]),
        leaf("home"),
    ];
    service.sync_navigation(&tree, &actor()).await?;
    let ids_first: Vec<(String, i32)> = nav_nodes::Entity::find()
        .all(&db)
        .await?
        .into_iter()
        .map(|row| (row.node_key, row.id))
        .collect();

    service.sync_navigation(&tree, &actor()).await?;
    let ids_second: Vec<(String, i32)> = nav_nodes::Entity::find()
        .all(&db)
        .await?
        .into_iter()
        .map(|row| (row.node_key, row.id))
        .collect();

    // No duplicate rows, same ids reused by business key
    assert_eq!(ids_first, ids_second);
    assert_eq!(service.get_navigation().await?, tree);

    Ok(())
}

#[tokio::test]
async fn test_parent_links_match_tree_shape() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    let tree = vec![folder(
        "a",
        vec![folder("b", vec![leaf("c")]), leaf("d")],
    )];
    service.sync_navigation(&tree, &actor()).await?;

    let a = find_row(&db, "a").await?;
    let b = find_row(&db, "b").await?;
    let c = find_row(&db, "c").await?;
    let d = find_row(&db, "d").await?;

    assert_eq!(a.parent_id, None);
    assert_eq!(b.parent_id, Some(a.id));
    assert_eq!(c.parent_id, Some(b.id));
    assert_eq!(d.parent_id, Some(a.id));

    Ok(())
}

#[tokio::test]
async fn test_key_reuse_within_one_batch() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    service
        .sync_navigation(&[folder("group", vec![leaf("item")])], &actor())
        .await?;

    // "group" disappears and "item" survives as a root; the stale delete runs
    // first so the cascade cannot take "item"'s key with it permanently
    service.sync_navigation(&[leaf("item")], &actor()).await?;

    assert_eq!(stored_keys(&db).await?, vec!["item"]);
    let item = find_row(&db, "item").await?;
    assert_eq!(item.parent_id, None);

    Ok(())
}

#[tokio::test]
async fn test_node_moved_to_root_is_unlinked() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    service
        .sync_navigation(&[folder("top", vec![leaf("inner")])], &actor())
        .await?;
    service
        .sync_navigation(&[folder("top", vec![]), leaf("inner")], &actor())
        .await?;

    let inner = find_row(&db, "inner").await?;
    assert_eq!(inner.parent_id, None);

    Ok(())
}

#[tokio::test]
async fn test_created_by_survives_resync() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    service.sync_navigation(&[leaf("home")], &actor()).await?;

    let other = Actor {
        id: "u-200".to_string(),
        name: "Bob".to_string(),
    };
    let mut renamed = leaf("home");
    renamed.label = "Home page".to_string();
    service.sync_navigation(&[renamed], &other).await?;

    let row = find_row(&db, "home").await?;
    assert_eq!(row.created_by.as_deref(), Some("u-100"));
    assert_eq!(row.updated_by.as_deref(), Some("u-200"));
    assert_eq!(row.label, "Home page");

    Ok(())
}

#[tokio::test]
async fn test_sync_rejects_duplicate_keys() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    let tree = vec![leaf("home"), folder("product", vec![leaf("home")])];
    let err = service.sync_navigation(&tree, &actor()).await.unwrap_err();
    assert!(matches!(err, NavError::DuplicateKey(key) if key == "home"));

    // Nothing was written
    assert!(stored_keys(&db).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_empty_store_is_distinct_error() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db);

    let err = service.get_navigation().await.unwrap_err();
    assert!(matches!(err, NavError::Empty));

    Ok(())
}

#[tokio::test]
async fn test_add_node_defaults() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    service
        .sync_navigation(&[folder("product", vec![leaf("prod_item")])], &actor())
        .await?;

    let node = service
        .add_node(
            NewNode {
                id: "specs".to_string(),
                label: "Specs".to_string(),
                label_zh: None,
                description: None,
                kind: NodeKind::Module,
                status: None,
                icon: None,
                parent: Some("product".to_string()),
            },
            &actor(),
        )
        .await?;

    assert_eq!(node.status, "draft");
    assert_eq!(node.icon.as_deref(), Some("file-text"));
    assert_eq!(node.sort_order, APPEND_SORT_ORDER);

    let parent = find_row(&db, "product").await?;
    assert_eq!(node.parent_id, Some(parent.id));

    // Appended node reads back as the last child
    let tree = service.get_navigation().await?;
    let children = tree[0].children.as_ref().unwrap();
    assert_eq!(children.last().unwrap().id, "specs");

    Ok(())
}

#[tokio::test]
async fn test_add_node_errors() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db);

    service
        .sync_navigation(&[leaf("home"), folder("product", vec![])], &actor())
        .await?;

    let new_node = |id: &str, parent: Option<&str>| NewNode {
        id: id.to_string(),
        label: id.to_string(),
        label_zh: None,
        description: None,
        kind: NodeKind::Module,
        status: None,
        icon: None,
        parent: parent.map(str::to_string),
    };

    let err = service
        .add_node(new_node("home", None), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, NavError::DuplicateKey(_)));

    let err = service
        .add_node(new_node("specs", Some("missing")), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, NavError::ParentNotFound(key) if key == "missing"));

    // Modules are leaves and cannot take children
    let err = service
        .add_node(new_node("specs", Some("home")), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, NavError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn test_update_node_merges_fields() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db);

    let mut home = leaf("home");
    home.description = Some("landing page".to_string());
    home.icon = Some("home".to_string());
    service.sync_navigation(&[home], &actor()).await?;

    let updated = service
        .update_node(
            "home",
            NodePatch {
                label: Some("Home".to_string()),
                status: Some(NodeStatus::Ready),
                ..Default::default()
            },
            &actor(),
        )
        .await?;

    assert_eq!(updated.label, "Home");
    assert_eq!(updated.status, "ready");
    // Unspecified fields remain untouched
    assert_eq!(updated.description.as_deref(), Some("landing page"));
    assert_eq!(updated.icon.as_deref(), Some("home"));

    let err = service
        .update_node("missing", NodePatch::default(), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, NavError::NodeNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_delete_cascades_to_descendants() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    let tree = vec![
        leaf("home"),
        folder("product", vec![leaf("prod_item"), folder("sub", vec![leaf("deep")])]),
    ];
    service.sync_navigation(&tree, &actor()).await?;

    service.delete_node("product").await?;

    assert_eq!(stored_keys(&db).await?, vec!["home"]);
    assert_eq!(service.get_navigation().await?, vec![leaf("home")]);

    Ok(())
}

#[tokio::test]
async fn test_move_node() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db.clone());

    service
        .sync_navigation(
            &[folder("a", vec![leaf("x")]), folder("b", vec![])],
            &actor(),
        )
        .await?;

    let b = find_row(&db, "b").await?;
    let moved = service
        .move_node("x", Some("b"), Some(0), &actor())
        .await?;
    assert_eq!(moved.parent_id, Some(b.id));

    let tree = service.get_navigation().await?;
    assert_eq!(tree[0].children.as_ref().unwrap().len(), 0);
    assert_eq!(tree[1].children.as_ref().unwrap()[0].id, "x");

    // Back to root
    let moved = service.move_node("x", None, None, &actor()).await?;
    assert_eq!(moved.parent_id, None);

    Ok(())
}

#[tokio::test]
async fn test_move_rejects_cycles() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db);

    service
        .sync_navigation(
            &[folder("outer", vec![folder("inner", vec![])])],
            &actor(),
        )
        .await?;

    let err = service
        .move_node("outer", Some("inner"), None, &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, NavError::Validation(_)));

    let err = service
        .move_node("outer", Some("outer"), None, &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, NavError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn test_reorder_children() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db);

    service
        .sync_navigation(
            &[folder("menu", vec![leaf("a"), leaf("b"), leaf("c")])],
            &actor(),
        )
        .await?;

    let order = vec!["c".to_string(), "a".to_string(), "b".to_string()];
    service
        .reorder_children(Some("menu"), &order, &actor())
        .await?;

    let tree = service.get_navigation().await?;
    let keys: Vec<&str> = tree[0]
        .children
        .as_ref()
        .unwrap()
        .iter()
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(keys, vec!["c", "a", "b"]);

    Ok(())
}

#[tokio::test]
async fn test_reorder_roots() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = NavigationService::new(db);

    service
        .sync_navigation(&[leaf("one"), leaf("two"), leaf("three")], &actor())
        .await?;

    let order = vec!["three".to_string(), "one".to_string(), "two".to_string()];
    service.reorder_children(None, &order, &actor()).await?;

    let tree = service.get_navigation().await?;
    let keys: Vec<&str> = tree.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(keys, vec!["three", "one", "two"]);

    let err = service
        .reorder_children(Some("missing"), &order, &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, NavError::ParentNotFound(_)));

    Ok(())
}
