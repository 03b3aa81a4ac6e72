//! MapStore Trait - Store Abstraction Layer
//!
//! This module defines the abstraction between the services (business logic)
//! and any concrete persistence backend.
//!
//! # Design Decisions
//!
//! 1. **Async reads, sync transactions**: plain lookups are async trait
//!    methods; all mutations run inside `run_in_transaction`, whose closure
//!    receives a synchronous [`StoreTx`] view. Each step inside the closure
//!    observes the prior step's state, and an `Err` return rolls the whole
//!    transaction back.
//! 2. **Uniqueness backstop**: `insert_node` / `update_coordinate` must
//!    reject an occupied coordinate with [`StoreError::CoordinateOccupied`].
//!    This is what converts a genuine concurrent conflict into a retryable
//!    failure.
//! 3. **Graceful reads**: lookup methods return `Option` rather than erroring
//!    on missing rows; strictness is a service-layer decision.
//!
//! # Examples
//!
//! ```rust,no_run
//! use hexmap_core::db::{MapStore, MemoryStore, StoreError};
//! use hexmap_core::models::{Coord, MapNode, NodeType, Visibility};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), StoreError> {
//! let store = MemoryStore::new();
//! let root = MapNode::new_root(1, 0, "content-1".to_string());
//!
//! store
//!     .run_in_transaction(|tx| tx.insert_node(root.clone()))
//!     .await?;
//!
//! assert!(store.get_node(&root.id).await?.is_some());
//! # Ok(())
//! # }
//! ```

use crate::db::StoreError;
use crate::models::{ContentPatch, ContentPayload, Coord, MapNode, NodeType, Visibility};
use async_trait::async_trait;

/// Abstraction over node and content persistence
///
/// Implementations must be `Send + Sync`. Reads outside a transaction may
/// observe a torn view concurrently with an in-flight mutation; callers
/// needing a consistent snapshot read inside the transaction instead.
#[async_trait]
pub trait MapStore: Send + Sync {
    /// Look up a node by id
    async fn get_node(&self, id: &str) -> Result<Option<MapNode>, StoreError>;

    /// Look up a node by coordinate
    async fn get_node_by_coord(&self, coord: &Coord) -> Result<Option<MapNode>, StoreError>;

    /// All nodes whose coordinate strictly extends `coord`'s path, scoped to
    /// the same owner/group forest, ordered by path length then path
    async fn get_descendants(&self, coord: &Coord) -> Result<Vec<MapNode>, StoreError>;

    /// Look up a content payload by id
    async fn get_content(&self, id: &str) -> Result<Option<ContentPayload>, StoreError>;

    /// Run `f` against a transactional view; commit on `Ok`, roll back on `Err`
    ///
    /// Validation reads issued through the view happen-before any write
    /// within the same transaction.
    async fn run_in_transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<R, E> + Send,
        R: Send,
        E: From<StoreError> + Send;
}

/// Synchronous transactional view over the store
///
/// Object-safe so service code can stay backend-agnostic inside the
/// transaction closure.
pub trait StoreTx {
    // Reads

    fn get_node(&self, id: &str) -> Option<MapNode>;

    fn get_node_by_coord(&self, coord: &Coord) -> Option<MapNode>;

    /// Strict path-extensions of `coord` in the same forest, ordered by path
    /// length then path
    fn descendants_of(&self, coord: &Coord) -> Vec<MapNode>;

    fn get_content(&self, id: &str) -> Option<ContentPayload>;

    // Node writes

    /// Insert a node; rejects an occupied coordinate or duplicate id
    fn insert_node(&mut self, node: MapNode) -> Result<(), StoreError>;

    /// Insert a batch of nodes; the batch fails on the first conflict
    fn insert_nodes(&mut self, nodes: Vec<MapNode>) -> Result<(), StoreError>;

    /// Re-address a node; rejects an occupied destination coordinate
    fn update_coordinate(&mut self, id: &str, coord: Coord) -> Result<MapNode, StoreError>;

    /// Re-link a node to a different parent id
    fn update_parent(&mut self, id: &str, parent_id: Option<String>) -> Result<(), StoreError>;

    fn update_type(&mut self, id: &str, node_type: NodeType) -> Result<MapNode, StoreError>;

    fn update_visibility(&mut self, id: &str, visibility: Visibility)
        -> Result<MapNode, StoreError>;

    /// Set visibility on the node at `root` and every descendant; returns the
    /// number of nodes updated
    fn batch_update_visibility(
        &mut self,
        root: &Coord,
        visibility: Visibility,
    ) -> Result<usize, StoreError>;

    fn remove_node(&mut self, id: &str) -> Result<(), StoreError>;

    // Content writes

    fn insert_content(&mut self, payload: ContentPayload) -> Result<(), StoreError>;

    fn insert_contents(&mut self, payloads: Vec<ContentPayload>) -> Result<(), StoreError>;

    fn update_content(
        &mut self,
        id: &str,
        patch: ContentPatch,
    ) -> Result<ContentPayload, StoreError>;

    fn remove_content(&mut self, id: &str) -> Result<(), StoreError>;
}
