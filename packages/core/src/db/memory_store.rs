//! In-Memory Store Backend
//!
//! `MemoryStore` keeps the whole forest in two hash maps (nodes by id,
//! coordinate index, contents by id) behind a `tokio::sync::RwLock`.
//! A transaction clones the state, runs the closure against the clone, and
//! swaps it in on commit; an `Err` return simply discards the clone.
//!
//! This is the backend used by the test suites and by embedders that do not
//! need durable persistence.

use crate::db::{MapStore, StoreError, StoreTx};
use crate::models::{ContentPatch, ContentPayload, Coord, MapNode, NodeType, Visibility};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone)]
struct MapState {
    nodes: HashMap<String, MapNode>,
    by_coord: HashMap<Coord, String>,
    contents: HashMap<String, ContentPayload>,
}

impl MapState {
    fn descendants_of(&self, coord: &Coord) -> Vec<MapNode> {
        let mut nodes: Vec<MapNode> = self
            .nodes
            .values()
            .filter(|node| coord.is_ancestor_of(&node.coord))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| {
            a.coord
                .path
                .len()
                .cmp(&b.coord.path.len())
                .then_with(|| a.coord.path.cmp(&b.coord.path))
        });
        nodes
    }
}

/// In-memory `MapStore` backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MapState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for service wiring
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl MapStore for MemoryStore {
    async fn get_node(&self, id: &str) -> Result<Option<MapNode>, StoreError> {
        Ok(self.state.read().await.nodes.get(id).cloned())
    }

    async fn get_node_by_coord(&self, coord: &Coord) -> Result<Option<MapNode>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .by_coord
            .get(coord)
            .and_then(|id| state.nodes.get(id))
            .cloned())
    }

    async fn get_descendants(&self, coord: &Coord) -> Result<Vec<MapNode>, StoreError> {
        Ok(self.state.read().await.descendants_of(coord))
    }

    async fn get_content(&self, id: &str) -> Result<Option<ContentPayload>, StoreError> {
        Ok(self.state.read().await.contents.get(id).cloned())
    }

    async fn run_in_transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<R, E> + Send,
        R: Send,
        E: From<StoreError> + Send,
    {
        let mut guard = self.state.write().await;
        let mut scratch = guard.clone();
        let result = {
            let mut tx = MemoryTx {
                state: &mut scratch,
            };
            f(&mut tx)
        };
        match result {
            Ok(value) => {
                *guard = scratch;
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }
}

struct MemoryTx<'a> {
    state: &'a mut MapState,
}

impl MemoryTx<'_> {
    fn node_mut(&mut self, id: &str) -> Result<&mut MapNode, StoreError> {
        self.state
            .nodes
            .get_mut(id)
            .ok_or_else(|| StoreError::node_not_found(id))
    }
}

impl StoreTx for MemoryTx<'_> {
    fn get_node(&self, id: &str) -> Option<MapNode> {
        self.state.nodes.get(id).cloned()
    }

    fn get_node_by_coord(&self, coord: &Coord) -> Option<MapNode> {
        self.state
            .by_coord
            .get(coord)
            .and_then(|id| self.state.nodes.get(id))
            .cloned()
    }

    fn descendants_of(&self, coord: &Coord) -> Vec<MapNode> {
        self.state.descendants_of(coord)
    }

    fn get_content(&self, id: &str) -> Option<ContentPayload> {
        self.state.contents.get(id).cloned()
    }

    fn insert_node(&mut self, node: MapNode) -> Result<(), StoreError> {
        if self.state.nodes.contains_key(&node.id) {
            return Err(StoreError::duplicate_id(&node.id));
        }
        if self.state.by_coord.contains_key(&node.coord) {
            return Err(StoreError::coordinate_occupied(node.coord.encode()));
        }
        self.state.by_coord.insert(node.coord.clone(), node.id.clone());
        self.state.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    fn insert_nodes(&mut self, nodes: Vec<MapNode>) -> Result<(), StoreError> {
        for node in nodes {
            self.insert_node(node)?;
        }
        Ok(())
    }

    fn update_coordinate(&mut self, id: &str, coord: Coord) -> Result<MapNode, StoreError> {
        match self.state.by_coord.get(&coord) {
            Some(occupant) if occupant != id => {
                return Err(StoreError::coordinate_occupied(coord.encode()));
            }
            _ => {}
        }
        let node = self.node_mut(id)?;
        let old_coord = node.coord.clone();
        node.coord = coord.clone();
        node.modified_at = Utc::now();
        let updated = node.clone();
        self.state.by_coord.remove(&old_coord);
        self.state.by_coord.insert(coord, id.to_string());
        Ok(updated)
    }

    fn update_parent(&mut self, id: &str, parent_id: Option<String>) -> Result<(), StoreError> {
        let node = self.node_mut(id)?;
        node.parent_id = parent_id;
        node.modified_at = Utc::now();
        Ok(())
    }

    fn update_type(&mut self, id: &str, node_type: NodeType) -> Result<MapNode, StoreError> {
        let node = self.node_mut(id)?;
        node.node_type = node_type;
        node.modified_at = Utc::now();
        Ok(node.clone())
    }

    fn update_visibility(
        &mut self,
        id: &str,
        visibility: Visibility,
    ) -> Result<MapNode, StoreError> {
        let node = self.node_mut(id)?;
        node.visibility = visibility;
        node.modified_at = Utc::now();
        Ok(node.clone())
    }

    fn batch_update_visibility(
        &mut self,
        root: &Coord,
        visibility: Visibility,
    ) -> Result<usize, StoreError> {
        let root_id = self
            .state
            .by_coord
            .get(root)
            .cloned()
            .ok_or_else(|| StoreError::node_not_found(root.encode()))?;
        let mut ids: Vec<String> = vec![root_id];
        ids.extend(self.state.descendants_of(root).into_iter().map(|n| n.id));
        let count = ids.len();
        for id in ids {
            self.update_visibility(&id, visibility)?;
        }
        Ok(count)
    }

    fn remove_node(&mut self, id: &str) -> Result<(), StoreError> {
        let node = self
            .state
            .nodes
            .remove(id)
            .ok_or_else(|| StoreError::node_not_found(id))?;
        self.state.by_coord.remove(&node.coord);
        Ok(())
    }

    fn insert_content(&mut self, payload: ContentPayload) -> Result<(), StoreError> {
        if self.state.contents.contains_key(&payload.id) {
            return Err(StoreError::duplicate_id(&payload.id));
        }
        self.state.contents.insert(payload.id.clone(), payload);
        Ok(())
    }

    fn insert_contents(&mut self, payloads: Vec<ContentPayload>) -> Result<(), StoreError> {
        for payload in payloads {
            self.insert_content(payload)?;
        }
        Ok(())
    }

    fn update_content(
        &mut self,
        id: &str,
        patch: ContentPatch,
    ) -> Result<ContentPayload, StoreError> {
        let payload = self
            .state
            .contents
            .get_mut(id)
            .ok_or_else(|| StoreError::content_not_found(id))?;
        patch.apply(payload);
        Ok(payload.clone())
    }

    fn remove_content(&mut self, id: &str) -> Result<(), StoreError> {
        self.state
            .contents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::content_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentFields, NodeType, Visibility};

    fn node_at(path: Vec<i8>, parent_id: Option<String>) -> MapNode {
        MapNode::new(
            Coord::new(1, 0, path),
            parent_id,
            NodeType::Organizational,
            Visibility::Private,
            "content".to_string(),
        )
    }

    #[tokio::test]
    async fn test_coordinate_uniqueness_backstop() {
        let store = MemoryStore::new();
        let first = node_at(vec![1], None);
        let second = node_at(vec![1], None);

        store
            .run_in_transaction(|tx| tx.insert_node(first))
            .await
            .unwrap();

        let err = store
            .run_in_transaction(|tx| tx.insert_node(second))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CoordinateOccupied { .. }));
    }

    #[tokio::test]
    async fn test_update_coordinate_rejects_occupied_slot() {
        let store = MemoryStore::new();
        let a = node_at(vec![1], None);
        let b = node_at(vec![2], None);
        let a_id = a.id.clone();
        let b_coord = b.coord.clone();

        store
            .run_in_transaction(|tx| {
                tx.insert_node(a)?;
                tx.insert_node(b)
            })
            .await
            .unwrap();

        let err = store
            .run_in_transaction(|tx| tx.update_coordinate(&a_id, b_coord))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CoordinateOccupied { .. }));
    }

    #[tokio::test]
    async fn test_failed_transaction_rolls_back() {
        let store = MemoryStore::new();
        let valid = node_at(vec![1], None);
        let valid_id = valid.id.clone();
        let colliding = node_at(vec![1], None);

        let err = store
            .run_in_transaction(|tx| {
                tx.insert_node(valid)?;
                // Collides with the node inserted one step earlier; the
                // whole transaction must discard both writes.
                tx.insert_node(colliding)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::CoordinateOccupied { .. }));
        assert!(store.get_node(&valid_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_intermediate_state_visible_within_transaction() {
        let store = MemoryStore::new();
        let a = node_at(vec![1], None);
        let a_id = a.id.clone();

        store
            .run_in_transaction::<_, _, StoreError>(|tx| {
                tx.insert_node(a)?;
                // Vacating [1] then re-inserting at [1] must succeed within
                // the same transaction.
                tx.update_coordinate(&a_id, Coord::new(1, 0, vec![2]))?;
                assert!(tx.get_node_by_coord(&Coord::new(1, 0, vec![1])).is_none());
                tx.insert_node(node_at(vec![1], None))
            })
            .await
            .unwrap();

        assert!(store
            .get_node_by_coord(&Coord::new(1, 0, vec![2]))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_descendants_scoped_to_forest() {
        let store = MemoryStore::new();
        let root = Coord::new(1, 0, vec![1]);

        store
            .run_in_transaction::<_, _, StoreError>(|tx| {
                tx.insert_node(node_at(vec![1], None))?;
                tx.insert_node(node_at(vec![1, 2], None))?;
                tx.insert_node(node_at(vec![1, 2, -3], None))?;
                // Same path shape, different forest
                let mut foreign = node_at(vec![1, 4], None);
                foreign.coord = Coord::new(2, 0, vec![1, 4]);
                tx.insert_node(foreign)
            })
            .await
            .unwrap();

        let descendants = store.get_descendants(&root).await.unwrap();
        assert_eq!(descendants.len(), 2);
        assert_eq!(descendants[0].coord.path, vec![1, 2]);
        assert_eq!(descendants[1].coord.path, vec![1, 2, -3]);
    }

    #[tokio::test]
    async fn test_batch_update_visibility_counts_subtree() {
        let store = MemoryStore::new();
        let root = Coord::new(1, 0, vec![1]);

        let count = store
            .run_in_transaction::<_, _, StoreError>(|tx| {
                tx.insert_node(node_at(vec![1], None))?;
                tx.insert_node(node_at(vec![1, 2], None))?;
                tx.insert_node(node_at(vec![1, -3], None))?;
                tx.batch_update_visibility(&root, Visibility::Public)
            })
            .await
            .unwrap();

        assert_eq!(count, 3);
        let node = store.get_node_by_coord(&root).await.unwrap().unwrap();
        assert_eq!(node.visibility, Visibility::Public);
    }

    #[tokio::test]
    async fn test_content_round_trip() {
        let store = MemoryStore::new();
        let payload = ContentPayload::new(ContentFields {
            title: "T".to_string(),
            body: "B".to_string(),
            ..Default::default()
        });
        let id = payload.id.clone();

        store
            .run_in_transaction(|tx| tx.insert_content(payload))
            .await
            .unwrap();

        let updated = store
            .run_in_transaction(|tx| {
                tx.update_content(&id, ContentPatch::new().with_title("T2".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(updated.title, "T2");
        assert_eq!(store.get_content(&id).await.unwrap().unwrap().title, "T2");
    }
}
