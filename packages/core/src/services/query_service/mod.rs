//! Query Service - Tree Traversal and Context Assembly
//!
//! Read-only traversal over the coordinate forest:
//!
//! - parent / ancestor / descendant lookups
//! - multi-tile context assembly for downstream consumers
//!
//! Traversal degrades gracefully: a missing parent is logged and treated as
//! a transient "tree under construction" state, never an error. Reads here
//! are not transactional and may observe a torn view next to an in-flight
//! mutation; consistency-sensitive callers read inside the mutation's own
//! transaction instead.

use crate::db::MapStore;
use crate::models::{ContentPayload, Coord, DirectionKind, MapNode};
use crate::services::error::MapServiceError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Ancestor chain of a node, nearest-first
///
/// `complete` distinguishes a walk that reached the forest root from one
/// truncated by a missing ancestor, so callers can tell an incomplete tree
/// apart from a clean root walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ancestry {
    /// Ancestors in parent → root order
    pub nodes: Vec<MapNode>,
    /// False when a lookup failed before reaching the root
    pub complete: bool,
}

impl Ancestry {
    /// Ancestors in root → parent order
    pub fn root_first(&self) -> Vec<MapNode> {
        self.nodes.iter().rev().cloned().collect()
    }
}

/// Inclusion flags for [`QueryService::get_context`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextStrategy {
    pub include_parent: bool,
    pub include_composed: bool,
    pub include_children: bool,
    pub include_grandchildren: bool,
}

impl Default for ContextStrategy {
    fn default() -> Self {
        Self {
            include_parent: true,
            include_composed: true,
            include_children: true,
            include_grandchildren: true,
        }
    }
}

/// Assembled neighborhood of a tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileContext {
    pub center: MapNode,
    pub parent: Option<MapNode>,
    /// Composed-direction children of the center
    pub composed: Vec<MapNode>,
    /// Structural children of the center
    pub children: Vec<MapNode>,
    /// Structural children of the structural children
    pub grandchildren: Vec<MapNode>,
}

/// Preview projection of a node for context assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePreview {
    pub id: String,
    pub coord: Coord,
    pub node_type: crate::models::NodeType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl NodePreview {
    fn from_node(node: &MapNode, content: Option<&ContentPayload>) -> Self {
        Self {
            id: node.id.clone(),
            coord: node.coord.clone(),
            node_type: node.node_type.clone(),
            title: content.map(|c| c.title.clone()).unwrap_or_default(),
            preview: content.and_then(|c| c.preview.clone()),
        }
    }
}

/// Context for generating or executing a root-level plan
///
/// The hexplan is the content of the direction-0 child. When no hexplan
/// exists yet but structural children do, `structural_leaves` carries the
/// leaf structural descendants so a plan can be generated from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HexecuteContext {
    pub center: MapNode,
    /// Ancestors in root → parent order
    pub ancestors: Vec<MapNode>,
    /// Composed-direction children of the center
    pub composed: Vec<MapNode>,
    /// Structural children, preview only
    pub children: Vec<NodePreview>,
    /// Content of the direction-0 node, if present
    pub hexplan: Option<ContentPayload>,
    /// Structural descendants with no structural children of their own;
    /// populated only when there is no hexplan but structural children exist
    pub structural_leaves: Vec<MapNode>,
}

/// Read-only traversal over the coordinate forest
pub struct QueryService<S: MapStore> {
    store: Arc<S>,
}

impl<S: MapStore> Clone for QueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: MapStore> QueryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Parent of the node at `coord`
    ///
    /// `None` at the forest root. A missing parent node is not an error: the
    /// tree may legitimately still be under construction, so it is logged
    /// and `None` is returned.
    pub async fn get_parent(&self, coord: &Coord) -> Result<Option<MapNode>, MapServiceError> {
        let Some(parent_coord) = coord.parent() else {
            return Ok(None);
        };
        let parent = self.store.get_node_by_coord(&parent_coord).await?;
        if parent.is_none() {
            tracing::warn!(
                coord = %coord,
                parent = %parent_coord,
                "parent missing; treating tree as under construction"
            );
        }
        Ok(parent)
    }

    /// All nodes whose coordinate strictly extends this node's, within the
    /// same owner/group forest
    pub async fn get_descendants(&self, node_id: &str) -> Result<Vec<MapNode>, MapServiceError> {
        let Some(node) = self.store.get_node(node_id).await? else {
            return Ok(Vec::new());
        };
        Ok(self.store.get_descendants(&node.coord).await?)
    }

    /// Walk coordinate truncation from the node up to the forest root
    ///
    /// Stops silently on a failed lookup and reports the partial chain with
    /// `complete == false`.
    pub async fn get_ancestors(&self, node_id: &str) -> Result<Ancestry, MapServiceError> {
        let Some(node) = self.store.get_node(node_id).await? else {
            return Ok(Ancestry {
                nodes: Vec::new(),
                complete: false,
            });
        };
        self.ancestors_of_coord(&node.coord).await
    }

    async fn ancestors_of_coord(&self, coord: &Coord) -> Result<Ancestry, MapServiceError> {
        let mut nodes = Vec::new();
        let mut cursor = coord.parent();
        while let Some(ancestor_coord) = cursor {
            match self.store.get_node_by_coord(&ancestor_coord).await? {
                Some(ancestor) => {
                    cursor = ancestor_coord.parent();
                    nodes.push(ancestor);
                }
                None => {
                    tracing::warn!(
                        coord = %coord,
                        missing = %ancestor_coord,
                        "ancestor walk truncated; tree under construction"
                    );
                    return Ok(Ancestry {
                        nodes,
                        complete: false,
                    });
                }
            }
        }
        Ok(Ancestry {
            nodes,
            complete: true,
        })
    }

    /// Single-pass assembly of a tile's neighborhood per the strategy flags
    pub async fn get_context(
        &self,
        center: &Coord,
        strategy: &ContextStrategy,
    ) -> Result<TileContext, MapServiceError> {
        let center_node = self
            .store
            .get_node_by_coord(center)
            .await?
            .ok_or_else(|| MapServiceError::coordinate_not_found(center.encode()))?;

        let parent = if strategy.include_parent {
            self.get_parent(center).await?
        } else {
            None
        };

        let mut composed = Vec::new();
        let mut children = Vec::new();
        let mut grandchildren = Vec::new();

        if strategy.include_composed || strategy.include_children || strategy.include_grandchildren
        {
            // One descendant fetch covers all three partitions
            for node in self.store.get_descendants(center).await? {
                let Some(suffix) = node.coord.relative_suffix_from(center) else {
                    continue;
                };
                match suffix.as_slice() {
                    [d] if DirectionKind::is_composed(*d) && strategy.include_composed => {
                        composed.push(node);
                    }
                    [d] if DirectionKind::is_structural(*d) && strategy.include_children => {
                        children.push(node);
                    }
                    [d1, d2]
                        if DirectionKind::is_structural(*d1)
                            && DirectionKind::is_structural(*d2)
                            && strategy.include_grandchildren =>
                    {
                        grandchildren.push(node);
                    }
                    _ => {}
                }
            }
        }

        Ok(TileContext {
            center: center_node,
            parent,
            composed,
            children,
            grandchildren,
        })
    }

    /// Specialized context for root-level plan generation and execution
    pub async fn get_hexecute_context(
        &self,
        center: &Coord,
    ) -> Result<HexecuteContext, MapServiceError> {
        let center_node = self
            .store
            .get_node_by_coord(center)
            .await?
            .ok_or_else(|| MapServiceError::coordinate_not_found(center.encode()))?;

        let ancestors = self.ancestors_of_coord(center).await?.root_first();
        let descendants = self.store.get_descendants(center).await?;

        let mut composed = Vec::new();
        let mut structural_children = Vec::new();
        let mut hexplan_node = None;
        for node in &descendants {
            let Some(suffix) = node.coord.relative_suffix_from(center) else {
                continue;
            };
            if let [d] = suffix.as_slice() {
                match DirectionKind::classify(*d) {
                    Ok(DirectionKind::Composed) => composed.push(node.clone()),
                    Ok(DirectionKind::Structural) => structural_children.push(node.clone()),
                    Ok(DirectionKind::Center) => hexplan_node = Some(node.clone()),
                    Err(_) => {}
                }
            }
        }

        let mut children = Vec::with_capacity(structural_children.len());
        for node in &structural_children {
            let content = self.store.get_content(&node.content_ref).await?;
            children.push(NodePreview::from_node(node, content.as_ref()));
        }

        let hexplan = match &hexplan_node {
            Some(node) => self.store.get_content(&node.content_ref).await?,
            None => None,
        };

        // Only when there is no plan yet but decomposition exists: collect
        // the structural leaves the plan would be generated from.
        let structural_leaves = if hexplan.is_none() && !structural_children.is_empty() {
            structural_leaves(center, &descendants)
        } else {
            Vec::new()
        };

        Ok(HexecuteContext {
            center: center_node,
            ancestors,
            composed,
            children,
            hexplan,
            structural_leaves,
        })
    }
}

/// Structural descendants of `center` that have no structural children of
/// their own
fn structural_leaves(center: &Coord, descendants: &[MapNode]) -> Vec<MapNode> {
    let structural: Vec<&MapNode> = descendants
        .iter()
        .filter(|node| {
            node.coord
                .relative_suffix_from(center)
                .is_some_and(|suffix| suffix.iter().all(|d| DirectionKind::is_structural(*d)))
        })
        .collect();

    structural
        .iter()
        .filter(|candidate| {
            !structural.iter().any(|other| {
                other.coord.path.len() == candidate.coord.path.len() + 1
                    && other.coord.path.starts_with(&candidate.coord.path)
            })
        })
        .map(|node| (*node).clone())
        .collect()
}

#[cfg(test)]
mod query_service_test;
