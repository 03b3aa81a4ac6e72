//! Tests for tree traversal and context assembly

use crate::db::{MapStore, MemoryStore, StoreError};
use crate::models::{ContentFields, ContentPayload, Coord, MapNode, NodeType, Visibility};
use crate::services::{ContextStrategy, MapServiceError, QueryService};
use std::sync::Arc;

/// Insert a node with its own payload at `path`, returning the node
async fn seed(store: &Arc<MemoryStore>, path: Vec<i8>, node_type: NodeType, title: &str) -> MapNode {
    let payload = ContentPayload::new(ContentFields {
        title: title.to_string(),
        body: format!("{title} body"),
        preview: Some(format!("{title} preview")),
        link: None,
    });
    let parent_id = match Coord::new(1, 0, path.clone()).parent() {
        Some(parent_coord) => store
            .get_node_by_coord(&parent_coord)
            .await
            .unwrap()
            .map(|n| n.id),
        None => None,
    };
    let node = MapNode::new(
        Coord::new(1, 0, path),
        parent_id,
        node_type,
        Visibility::Private,
        payload.id.clone(),
    );
    let inserted = node.clone();
    store
        .run_in_transaction::<_, _, StoreError>(move |tx| {
            tx.insert_content(payload)?;
            tx.insert_node(node)
        })
        .await
        .unwrap();
    inserted
}

async fn seeded_forest() -> (Arc<MemoryStore>, QueryService<MemoryStore>) {
    let store = MemoryStore::shared();
    let queries = QueryService::new(store.clone());
    (store, queries)
}

#[tokio::test]
async fn test_get_parent_at_root_is_none() {
    let (store, queries) = seeded_forest().await;
    let root = seed(&store, vec![], NodeType::User, "Root").await;
    assert!(queries.get_parent(&root.coord).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_parent_missing_is_transient_not_error() {
    let (store, queries) = seeded_forest().await;
    // Orphan: no node at [2]
    let orphan = seed(&store, vec![2, 1], NodeType::Organizational, "Orphan").await;
    assert!(queries.get_parent(&orphan.coord).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_descendants() {
    let (store, queries) = seeded_forest().await;
    seed(&store, vec![], NodeType::User, "Root").await;
    let a = seed(&store, vec![1], NodeType::Organizational, "A").await;
    seed(&store, vec![1, 2], NodeType::Organizational, "B").await;
    seed(&store, vec![1, 2, -3], NodeType::Organizational, "C").await;
    seed(&store, vec![4], NodeType::Organizational, "Sibling").await;

    let descendants = queries.get_descendants(&a.id).await.unwrap();
    let paths: Vec<Vec<i8>> = descendants.iter().map(|n| n.coord.path.clone()).collect();
    assert_eq!(paths, vec![vec![1, 2], vec![1, 2, -3]]);
}

#[tokio::test]
async fn test_get_descendants_of_unknown_node_is_empty() {
    let (_store, queries) = seeded_forest().await;
    assert!(queries.get_descendants("missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_ancestors_complete() {
    let (store, queries) = seeded_forest().await;
    let root = seed(&store, vec![], NodeType::User, "Root").await;
    let a = seed(&store, vec![1], NodeType::Organizational, "A").await;
    let b = seed(&store, vec![1, 2], NodeType::Organizational, "B").await;

    let ancestry = queries.get_ancestors(&b.id).await.unwrap();
    assert!(ancestry.complete);
    let nearest_first: Vec<String> = ancestry.nodes.iter().map(|n| n.id.clone()).collect();
    assert_eq!(nearest_first, vec![a.id.clone(), root.id.clone()]);
    let root_first: Vec<String> = ancestry.root_first().iter().map(|n| n.id.clone()).collect();
    assert_eq!(root_first, vec![root.id, a.id]);
}

#[tokio::test]
async fn test_get_ancestors_truncates_on_missing_link() {
    let (store, queries) = seeded_forest().await;
    // [1] exists, root does not
    let a = seed(&store, vec![1], NodeType::Organizational, "A").await;
    let b = seed(&store, vec![1, 2], NodeType::Organizational, "B").await;

    let ancestry = queries.get_ancestors(&b.id).await.unwrap();
    assert!(!ancestry.complete);
    assert_eq!(ancestry.nodes.len(), 1);
    assert_eq!(ancestry.nodes[0].id, a.id);
}

#[tokio::test]
async fn test_get_context_partitions_neighborhood() {
    let (store, queries) = seeded_forest().await;
    seed(&store, vec![], NodeType::User, "Root").await;
    let center = seed(&store, vec![1], NodeType::Organizational, "Center").await;
    seed(&store, vec![1, 2], NodeType::Organizational, "Child2").await;
    seed(&store, vec![1, 5], NodeType::Organizational, "Child5").await;
    seed(&store, vec![1, -3], NodeType::Organizational, "Composed").await;
    seed(&store, vec![1, 2, 1], NodeType::Organizational, "Grandchild").await;
    seed(&store, vec![1, 2, -1], NodeType::Organizational, "ComposedGrandchild").await;
    seed(&store, vec![1, 2, 1, 4], NodeType::Organizational, "TooDeep").await;

    let context = queries
        .get_context(&center.coord, &ContextStrategy::default())
        .await
        .unwrap();

    assert_eq!(context.center.id, center.id);
    assert!(context.parent.is_some());
    assert_eq!(context.composed.len(), 1);
    assert_eq!(context.composed[0].coord.path, vec![1, -3]);
    let child_paths: Vec<Vec<i8>> = context.children.iter().map(|n| n.coord.path.clone()).collect();
    assert_eq!(child_paths, vec![vec![1, 2], vec![1, 5]]);
    assert_eq!(context.grandchildren.len(), 1);
    assert_eq!(context.grandchildren[0].coord.path, vec![1, 2, 1]);
}

#[tokio::test]
async fn test_get_context_honors_strategy_flags() {
    let (store, queries) = seeded_forest().await;
    seed(&store, vec![], NodeType::User, "Root").await;
    let center = seed(&store, vec![1], NodeType::Organizational, "Center").await;
    seed(&store, vec![1, 2], NodeType::Organizational, "Child").await;
    seed(&store, vec![1, -3], NodeType::Organizational, "Composed").await;

    let strategy = ContextStrategy {
        include_parent: false,
        include_composed: false,
        include_children: true,
        include_grandchildren: false,
    };
    let context = queries.get_context(&center.coord, &strategy).await.unwrap();
    assert!(context.parent.is_none());
    assert!(context.composed.is_empty());
    assert_eq!(context.children.len(), 1);
}

#[tokio::test]
async fn test_get_context_unknown_center_is_strict() {
    let (_store, queries) = seeded_forest().await;
    let err = queries
        .get_context(&Coord::new(1, 0, vec![6]), &ContextStrategy::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MapServiceError::CoordinateNotFound { .. }));
}

#[tokio::test]
async fn test_hexecute_context_with_hexplan() {
    let (store, queries) = seeded_forest().await;
    seed(&store, vec![], NodeType::User, "Root").await;
    let center = seed(&store, vec![1], NodeType::Organizational, "Center").await;
    seed(&store, vec![1, 0], NodeType::Organizational, "Plan").await;
    seed(&store, vec![1, 2], NodeType::Organizational, "Child").await;
    seed(&store, vec![1, -4], NodeType::Organizational, "Material").await;

    let context = queries.get_hexecute_context(&center.coord).await.unwrap();

    assert_eq!(context.ancestors.len(), 1);
    assert_eq!(context.ancestors[0].coord.path, Vec::<i8>::new());
    assert_eq!(context.composed.len(), 1);
    assert_eq!(context.children.len(), 1);
    assert_eq!(context.children[0].title, "Child");
    assert_eq!(context.children[0].preview.as_deref(), Some("Child preview"));
    assert_eq!(context.hexplan.as_ref().unwrap().title, "Plan");
    // A plan exists, so no leaf collection happens
    assert!(context.structural_leaves.is_empty());
}

#[tokio::test]
async fn test_hexecute_context_collects_leaves_without_hexplan() {
    let (store, queries) = seeded_forest().await;
    seed(&store, vec![], NodeType::User, "Root").await;
    let center = seed(&store, vec![1], NodeType::Organizational, "Center").await;
    seed(&store, vec![1, 2], NodeType::Organizational, "Branch").await;
    seed(&store, vec![1, 2, 3], NodeType::Organizational, "Leaf A").await;
    seed(&store, vec![1, 5], NodeType::Organizational, "Leaf B").await;
    // Composed child under the branch must not count as a structural leaf
    seed(&store, vec![1, 2, -1], NodeType::Organizational, "Material").await;

    let context = queries.get_hexecute_context(&center.coord).await.unwrap();

    assert!(context.hexplan.is_none());
    let mut leaf_paths: Vec<Vec<i8>> = context
        .structural_leaves
        .iter()
        .map(|n| n.coord.path.clone())
        .collect();
    leaf_paths.sort();
    assert_eq!(leaf_paths, vec![vec![1, 2, 3], vec![1, 5]]);
}

#[tokio::test]
async fn test_hexecute_context_no_children_no_leaves() {
    let (store, queries) = seeded_forest().await;
    seed(&store, vec![], NodeType::User, "Root").await;
    let center = seed(&store, vec![1], NodeType::Organizational, "Center").await;

    let context = queries.get_hexecute_context(&center.coord).await.unwrap();
    assert!(context.hexplan.is_none());
    assert!(context.children.is_empty());
    assert!(context.structural_leaves.is_empty());
}
