//! Mutation Service - Atomic Tree Operations
//!
//! Every operation here runs inside one store transaction per call:
//! validation reads happen first, writes follow, and any failure rolls the
//! whole call back. The multi-step operations (`move_subtree`,
//! `copy_subtree`) report mid-sequence failures as
//! [`MapServiceError::TransactionAborted`] with the originating cause
//! attached.
//!
//! # Operations
//!
//! - `create` - validated node + payload creation
//! - `update_content` - payload-only update
//! - `update_type` - type update with structural cascade for System/Context
//! - `update_visibility_cascade` - whole-subtree visibility set
//! - `remove` - unconditional whole-subtree delete, deepest-first
//! - `move_subtree` - collision-aware relocation (swap on collision)
//! - `copy_subtree` - provenance-preserving deep copy
//!
//! Concurrent mutations over overlapping coordinate space are not locked
//! against each other; the store's coordinate-uniqueness backstop converts a
//! genuine conflict into a retryable transaction failure.

use crate::db::{MapStore, StoreError, StoreTx};
use crate::models::{
    ContentFields, ContentPatch, ContentPayload, Coord, DirectionKind, MapNode, NodeType,
    Visibility,
};
use crate::services::error::{ConstraintViolation, MapServiceError};
use crate::services::validation::{
    validate_ownership, validate_type_for_create, validate_type_for_update,
    validate_visibility_inheritance, Requester,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Parameters for creating a node
#[derive(Debug, Clone)]
pub struct CreateNodeParams {
    /// Parent node id; `None` only when creating a forest root
    pub parent_id: Option<String>,
    /// Coordinate of the new node; must be a direct child of the parent
    pub coord: Coord,
    pub node_type: NodeType,
    pub visibility: Visibility,
    /// Content for the payload the node will own
    pub content: ContentFields,
}

/// Atomic tree mutations over a [`MapStore`]
pub struct MutationService<S: MapStore> {
    store: Arc<S>,
}

impl<S: MapStore> Clone for MutationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: MapStore> MutationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Access to the underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a node with its content payload
    ///
    /// Validates parent existence, direct-child adjacency, the type rule
    /// table, and visibility inheritance, then persists the payload and the
    /// node referencing it. The store's uniqueness backstop rejects an
    /// occupied coordinate.
    pub async fn create(&self, params: CreateNodeParams) -> Result<MapNode, MapServiceError> {
        let CreateNodeParams {
            parent_id,
            coord,
            node_type,
            visibility,
            content,
        } = params;

        self.store
            .run_in_transaction(move |tx| {
                if coord.is_root() {
                    if node_type != NodeType::User {
                        return Err(ConstraintViolation::UserAtRootOnly {
                            context: format!("root slot {} requires the user type", coord.encode()),
                        }
                        .into());
                    }
                    if parent_id.is_some() {
                        return Err(ConstraintViolation::UserAtRootOnly {
                            context: "a forest root cannot have a parent".to_string(),
                        }
                        .into());
                    }
                } else {
                    if node_type == NodeType::User {
                        return Err(ConstraintViolation::UserAtRootOnly {
                            context: format!(
                                "cannot create a user node at non-root {}",
                                coord.encode()
                            ),
                        }
                        .into());
                    }
                    let parent_id = parent_id.as_deref().ok_or_else(|| {
                        MapServiceError::Constraint(ConstraintViolation::NotDirectChild {
                            coord: coord.encode(),
                            parent: "(none supplied)".to_string(),
                        })
                    })?;
                    let parent = tx
                        .get_node(parent_id)
                        .ok_or_else(|| MapServiceError::node_not_found(parent_id))?;
                    if Some(&parent.coord) != coord.parent().as_ref() {
                        return Err(ConstraintViolation::NotDirectChild {
                            coord: coord.encode(),
                            parent: parent.coord.encode(),
                        }
                        .into());
                    }
                    let direction = coord.direction().unwrap_or(0);
                    validate_type_for_create(&parent.node_type, &node_type, direction)?;
                    validate_visibility_inheritance(tx, &coord, visibility)?;
                }

                let payload = ContentPayload::new(content);
                let node = MapNode::new(
                    coord,
                    parent_id,
                    node_type,
                    visibility,
                    payload.id.clone(),
                );
                tx.insert_content(payload)?;
                tx.insert_node(node.clone())?;
                debug!(coord = %node.coord, node_type = %node.node_type, "created node");
                Ok(node)
            })
            .await
    }

    /// Payload-only update; coordinate, type, and visibility untouched
    pub async fn update_content(
        &self,
        node_id: &str,
        patch: ContentPatch,
    ) -> Result<ContentPayload, MapServiceError> {
        let node_id = node_id.to_string();
        self.store
            .run_in_transaction(move |tx| {
                let node = tx
                    .get_node(&node_id)
                    .ok_or_else(|| MapServiceError::node_not_found(&node_id))?;
                Ok(tx.update_content(&node.content_ref, patch)?)
            })
            .await
    }

    /// Update a node's type, cascading System/Context onto every structural
    /// descendant
    ///
    /// The cascade follows all-structural relative paths only; entering a
    /// composed or center slot ends it, so composed subtrees keep their
    /// types.
    pub async fn update_type(
        &self,
        node_id: &str,
        new_type: NodeType,
    ) -> Result<MapNode, MapServiceError> {
        let node_id = node_id.to_string();
        self.store
            .run_in_transaction(move |tx| {
                let node = tx
                    .get_node(&node_id)
                    .ok_or_else(|| MapServiceError::node_not_found(&node_id))?;
                validate_type_for_update(tx, &node.coord, &new_type)?;

                let updated = tx.update_type(&node_id, new_type.clone())?;
                if new_type.cascades() {
                    let mut cascaded = 0usize;
                    for descendant in tx.descendants_of(&node.coord) {
                        let structural = descendant
                            .coord
                            .relative_suffix_from(&node.coord)
                            .is_some_and(|suffix| {
                                suffix.iter().all(|d| DirectionKind::is_structural(*d))
                            });
                        if structural {
                            tx.update_type(&descendant.id, new_type.clone())?;
                            cascaded += 1;
                        }
                    }
                    debug!(coord = %node.coord, %new_type, cascaded, "type cascade applied");
                }
                Ok(updated)
            })
            .await
    }

    /// Set visibility on the node at `coord` and all of its descendants
    /// (structural and composed); returns the number of nodes updated
    pub async fn update_visibility_cascade(
        &self,
        coord: &Coord,
        visibility: Visibility,
        requester: &Requester,
    ) -> Result<usize, MapServiceError> {
        let coord = coord.clone();
        let requester = requester.clone();
        self.store
            .run_in_transaction(move |tx| {
                if tx.get_node_by_coord(&coord).is_none() {
                    return Err(MapServiceError::coordinate_not_found(coord.encode()));
                }
                validate_ownership(&requester, coord.owner_id)?;
                validate_visibility_inheritance(tx, &coord, visibility)?;
                let count = tx.batch_update_visibility(&coord, visibility)?;
                info!(coord = %coord, ?visibility, count, "visibility cascade committed");
                Ok(count)
            })
            .await
    }

    /// Remove the node at `coord` and its entire subtree, deepest-first
    ///
    /// Unconditional: there is no soft-delete and no partial removal.
    /// Returns the number of nodes removed.
    pub async fn remove(&self, coord: &Coord) -> Result<usize, MapServiceError> {
        let coord = coord.clone();
        self.store
            .run_in_transaction(move |tx| {
                let node = tx
                    .get_node_by_coord(&coord)
                    .ok_or_else(|| MapServiceError::coordinate_not_found(coord.encode()))?;
                let mut doomed = tx.descendants_of(&coord);
                doomed.push(node);
                // reverse topological: children before their parents
                doomed.sort_by(|a, b| b.coord.path.len().cmp(&a.coord.path.len()));

                let count = doomed.len();
                for node in doomed {
                    tx.remove_content(&node.content_ref)?;
                    tx.remove_node(&node.id)?;
                }
                info!(coord = %coord, count, "removed subtree");
                Ok(count)
            })
            .await
    }

    /// Relocate the subtree at `old` to `new`, swapping with any occupant
    ///
    /// Steps inside one transaction:
    ///
    /// 1. validate source, both structural parents, visibility inheritance
    ///    at each end, and (when colliding) the occupant's legality back at
    ///    `old`
    /// 2. displace an occupant of `new` to a free temporary slot under the
    ///    source's former parent
    /// 3. move the source subtree, descendants keeping their relative paths
    /// 4. move the displaced occupant to `old`, completing the swap
    ///
    /// Returns every node whose coordinate changed. Mid-sequence failures
    /// surface as `TransactionAborted` and roll back completely.
    pub async fn move_subtree(
        &self,
        old: &Coord,
        new: &Coord,
    ) -> Result<Vec<MapNode>, MapServiceError> {
        let old = old.clone();
        let new = new.clone();
        self.store
            .run_in_transaction(move |tx| {
                // Validation phase: reads only, errors surface directly.
                if old == new {
                    return Err(ConstraintViolation::SelfTargeted {
                        coord: old.encode(),
                    }
                    .into());
                }
                if !old.same_forest(&new) {
                    return Err(ConstraintViolation::CrossForest {
                        a: old.encode(),
                        b: new.encode(),
                    }
                    .into());
                }
                // Root checks come before the overlap check: the root is an
                // ancestor of every same-forest coordinate, so the overlap
                // test alone would shadow the real error.
                let Some(old_parent_coord) = old.parent() else {
                    return Err(ConstraintViolation::UserAtRootOnly {
                        context: format!("cannot relocate forest root {}", old.encode()),
                    }
                    .into());
                };
                let Some(new_parent_coord) = new.parent() else {
                    return Err(ConstraintViolation::UserAtRootOnly {
                        context: format!("cannot move onto forest root {}", new.encode()),
                    }
                    .into());
                };
                if old.is_ancestor_of(&new) || new.is_ancestor_of(&old) {
                    return Err(ConstraintViolation::OverlappingMove {
                        from: old.encode(),
                        dest: new.encode(),
                    }
                    .into());
                }

                let source = tx
                    .get_node_by_coord(&old)
                    .ok_or_else(|| MapServiceError::coordinate_not_found(old.encode()))?;
                if source.node_type == NodeType::User {
                    return Err(ConstraintViolation::UserAtRootOnly {
                        context: format!("cannot relocate user node {}", source.id),
                    }
                    .into());
                }
                let old_parent = tx
                    .get_node_by_coord(&old_parent_coord)
                    .ok_or_else(|| MapServiceError::coordinate_not_found(old_parent_coord.encode()))?;
                let new_parent = tx
                    .get_node_by_coord(&new_parent_coord)
                    .ok_or_else(|| MapServiceError::coordinate_not_found(new_parent_coord.encode()))?;

                validate_type_for_create(
                    &new_parent.node_type,
                    &source.node_type,
                    new.direction().unwrap_or(0),
                )?;
                if source.visibility.is_public() {
                    validate_visibility_inheritance(tx, &new, Visibility::Public)?;
                }

                let occupant = tx.get_node_by_coord(&new);
                if let Some(target) = &occupant {
                    // The displaced node ends up at `old`; it must be legal there.
                    validate_type_for_create(
                        &old_parent.node_type,
                        &target.node_type,
                        old.direction().unwrap_or(0),
                    )?;
                    if target.visibility.is_public() {
                        validate_visibility_inheritance(tx, &old, Visibility::Public)?;
                    }
                }

                // Write phase: any failure aborts the transaction.
                write_move(tx, &old, &new, &source, &old_parent, &new_parent, occupant)
                    .map_err(|e| MapServiceError::transaction_aborted("move", e))
            })
            .await
    }

    /// Deep, non-destructive copy of the subtree at `source` to `dest`
    ///
    /// Fails before any write if `dest` is occupied. Every copy gets a fresh
    /// id and a fresh payload, with `origin_id` pointing at the source node
    /// it was copied from. Returns the copied root; descendants are
    /// persisted but not individually returned.
    pub async fn copy_subtree(
        &self,
        source: &Coord,
        dest: &Coord,
        dest_parent_id: &str,
    ) -> Result<MapNode, MapServiceError> {
        let source = source.clone();
        let dest = dest.clone();
        let dest_parent_id = dest_parent_id.to_string();
        self.store
            .run_in_transaction(move |tx| {
                if source == dest {
                    return Err(ConstraintViolation::SelfTargeted {
                        coord: source.encode(),
                    }
                    .into());
                }
                if dest.is_root() {
                    return Err(ConstraintViolation::UserAtRootOnly {
                        context: format!("cannot copy onto forest root {}", dest.encode()),
                    }
                    .into());
                }
                let source_node = tx
                    .get_node_by_coord(&source)
                    .ok_or_else(|| MapServiceError::coordinate_not_found(source.encode()))?;
                if source_node.node_type == NodeType::User {
                    // Copying a forest root would mint a User node off-root;
                    // composed destinations skip the type table, so this
                    // needs its own guard.
                    return Err(ConstraintViolation::UserAtRootOnly {
                        context: format!("cannot copy user node {}", source_node.id),
                    }
                    .into());
                }
                let dest_parent = tx
                    .get_node(&dest_parent_id)
                    .ok_or_else(|| MapServiceError::node_not_found(&dest_parent_id))?;
                if Some(&dest_parent.coord) != dest.parent().as_ref() {
                    return Err(ConstraintViolation::NotDirectChild {
                        coord: dest.encode(),
                        parent: dest_parent.coord.encode(),
                    }
                    .into());
                }
                validate_type_for_create(
                    &dest_parent.node_type,
                    &source_node.node_type,
                    dest.direction().unwrap_or(0),
                )?;
                if source_node.visibility.is_public() {
                    validate_visibility_inheritance(tx, &dest, Visibility::Public)?;
                }
                if tx.get_node_by_coord(&dest).is_some() {
                    return Err(ConstraintViolation::DestinationOccupied {
                        coord: dest.encode(),
                    }
                    .into());
                }

                write_copy(tx, &source_node, &dest, &dest_parent.id)
                    .map_err(|e| MapServiceError::transaction_aborted("copy", e))
            })
            .await
    }
}

/// Displacement + relocation steps of `move_subtree`
fn write_move(
    tx: &mut dyn StoreTx,
    old: &Coord,
    new: &Coord,
    source: &MapNode,
    old_parent: &MapNode,
    new_parent: &MapNode,
    occupant: Option<MapNode>,
) -> Result<Vec<MapNode>, MapServiceError> {
    let displaced = match &occupant {
        Some(target) => {
            // The uniqueness backstop forbids two nodes sharing a slot even
            // momentarily, so the occupant parks at a free slot under the
            // source's former parent first.
            let temp = find_free_slot(tx, &old_parent.coord, &[old, new]).ok_or(
                ConstraintViolation::NoDisplacementSlot {
                    parent: old_parent.coord.encode(),
                },
            )?;
            let temp_parent_id = temp
                .parent()
                .and_then(|coord| tx.get_node_by_coord(&coord))
                .map(|node| node.id);
            relocate_branch(tx, &target.id, &temp, temp_parent_id)?;
            debug!(target = %target.coord, temp = %temp, "displaced move target");
            Some(target.id.clone())
        }
        None => None,
    };

    let mut changed = relocate_branch(tx, &source.id, new, Some(new_parent.id.clone()))?;

    if let Some(target_id) = displaced {
        changed.extend(relocate_branch(tx, &target_id, old, Some(old_parent.id.clone()))?);
    }

    info!(
        old = %old,
        new = %new,
        swapped = occupant.is_some(),
        changed = changed.len(),
        "move committed"
    );
    Ok(changed)
}

/// Move a node and its whole subtree to `dest`, preserving relative paths
fn relocate_branch(
    tx: &mut dyn StoreTx,
    root_id: &str,
    dest: &Coord,
    new_parent_id: Option<String>,
) -> Result<Vec<MapNode>, StoreError> {
    let root = tx
        .get_node(root_id)
        .ok_or_else(|| StoreError::node_not_found(root_id))?;
    let descendants = tx.descendants_of(&root.coord);

    let mut moved = Vec::with_capacity(descendants.len() + 1);
    tx.update_parent(root_id, new_parent_id)?;
    moved.push(tx.update_coordinate(root_id, dest.clone())?);

    for descendant in descendants {
        let Some(suffix) = descendant.coord.relative_suffix_from(&root.coord) else {
            continue;
        };
        let mut path = dest.path.clone();
        path.extend(suffix);
        moved.push(tx.update_coordinate(&descendant.id, dest.with_path(path))?);
    }
    Ok(moved)
}

/// First unoccupied slot under `parent` that is outside every `avoid`
/// subtree, searching structural then composed slots up to two levels deep
fn find_free_slot(tx: &dyn StoreTx, parent: &Coord, avoid: &[&Coord]) -> Option<Coord> {
    let conflicted = |candidate: &Coord| {
        avoid
            .iter()
            .any(|a| *a == candidate || a.is_ancestor_of(candidate))
    };
    let directions: Vec<i8> = (1..=6).chain(-6..=-1).collect();

    for &d in &directions {
        let candidate = parent.child(d);
        if !conflicted(&candidate) && tx.get_node_by_coord(&candidate).is_none() {
            return Some(candidate);
        }
    }
    // Every direct slot is taken; park one level deeper under an occupied
    // sibling instead.
    for &d in &directions {
        let slot = parent.child(d);
        if conflicted(&slot) || tx.get_node_by_coord(&slot).is_none() {
            continue;
        }
        for &d2 in &directions {
            let candidate = slot.child(d2);
            if !conflicted(&candidate) && tx.get_node_by_coord(&candidate).is_none() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Payload duplication + node batch-create steps of `copy_subtree`
fn write_copy(
    tx: &mut dyn StoreTx,
    source_node: &MapNode,
    dest: &Coord,
    dest_parent_id: &str,
) -> Result<MapNode, MapServiceError> {
    let mut originals = vec![source_node.clone()];
    originals.extend(tx.descendants_of(&source_node.coord));

    let mut payloads = Vec::with_capacity(originals.len());
    let mut copies: Vec<MapNode> = Vec::with_capacity(originals.len());
    let mut id_by_coord: HashMap<Coord, String> = HashMap::new();

    // Shallow-first order guarantees a copied parent exists before its
    // children need its id.
    for original in &originals {
        let payload = tx
            .get_content(&original.content_ref)
            .ok_or_else(|| StoreError::content_not_found(&original.content_ref))?
            .duplicate();
        let Some(suffix) = original.coord.relative_suffix_from(&source_node.coord) else {
            continue;
        };
        let mut path = dest.path.clone();
        path.extend(suffix.iter().copied());
        let new_coord = dest.with_path(path);

        let parent_id = if suffix.is_empty() {
            Some(dest_parent_id.to_string())
        } else {
            new_coord
                .parent()
                .and_then(|coord| id_by_coord.get(&coord).cloned())
        };

        let mut copy = MapNode::new(
            new_coord,
            parent_id,
            original.node_type.clone(),
            original.visibility,
            payload.id.clone(),
        );
        copy.origin_id = Some(original.id.clone());
        id_by_coord.insert(copy.coord.clone(), copy.id.clone());
        payloads.push(payload);
        copies.push(copy);
    }

    let root_copy = copies
        .first()
        .cloned()
        .ok_or_else(|| StoreError::node_not_found(&source_node.id))?;
    tx.insert_contents(payloads)?;
    tx.insert_nodes(copies)?;

    info!(
        source = %source_node.coord,
        dest = %dest,
        "copy committed"
    );
    Ok(root_copy)
}

