//! Constraint Validation
//!
//! Business rules applied before any mutation commits:
//!
//! - the type-hierarchy rule table (structural children only; custom tags
//!   bypass it entirely)
//! - restrictive visibility inheritance (PUBLIC requires an all-PUBLIC
//!   ancestor chain)
//! - ownership checks for visibility mutations
//!
//! All checks that need tree state take a [`StoreTx`] view so they observe
//! the same transaction they guard.

use crate::db::StoreTx;
use crate::models::{Coord, DirectionKind, NodeType, Visibility};
use crate::services::error::ConstraintViolation;

/// Who is asking for a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    /// An authenticated end user
    User(u64),
    /// An internal/system caller; bypasses ownership checks
    Internal,
}

impl Requester {
    fn label(&self) -> String {
        match self {
            Requester::User(id) => format!("user:{id}"),
            Requester::Internal => "internal".to_string(),
        }
    }
}

/// The centralized parent-type → child-type rule table
///
/// Keeping the whole rule set in one predicate keeps it independently
/// testable, instead of scattering conditionals across create/update paths.
pub mod type_rules {
    use super::NodeType;

    /// Whether `parent` may have a structural child of type `child`
    ///
    /// Custom tags on either side bypass the hierarchy entirely.
    pub fn allows(parent: &NodeType, child: &NodeType) -> bool {
        if !parent.is_builtin() || !child.is_builtin() {
            return true;
        }
        match (parent, child) {
            // User nodes exist only at the forest root
            (_, NodeType::User) => false,
            // System and Context subtrees stay homogeneous
            (NodeType::System, other) => *other == NodeType::System,
            (NodeType::Context, other) => *other == NodeType::Context,
            // Organizational only under User or Organizational
            (NodeType::User | NodeType::Organizational, _) => true,
            (_, NodeType::Organizational) => false,
            _ => true,
        }
    }
}

/// Validate the rule table for a node being created under `parent_type`
///
/// Applies only to structural children; center and composed slots are exempt.
pub fn validate_type_for_create(
    parent_type: &NodeType,
    child_type: &NodeType,
    direction: i8,
) -> Result<(), ConstraintViolation> {
    if !DirectionKind::is_structural(direction) {
        return Ok(());
    }
    if type_rules::allows(parent_type, child_type) {
        Ok(())
    } else {
        Err(ConstraintViolation::TypeHierarchy {
            parent: parent_type.to_string(),
            child: child_type.to_string(),
        })
    }
}

/// Re-run the rule table against the node's current parent before a type
/// update proceeds or cascades
pub fn validate_type_for_update(
    tx: &dyn StoreTx,
    coord: &Coord,
    new_type: &NodeType,
) -> Result<(), ConstraintViolation> {
    if coord.is_root() {
        // Root slots are User by construction; retyping one breaks the
        // forest shape.
        return if *new_type == NodeType::User {
            Ok(())
        } else {
            Err(ConstraintViolation::UserAtRootOnly {
                context: format!("cannot retype root {}", coord.encode()),
            })
        };
    }
    if *new_type == NodeType::User {
        return Err(ConstraintViolation::UserAtRootOnly {
            context: format!("cannot assign user type at {}", coord.encode()),
        });
    }

    let direction = coord.direction().unwrap_or(0);
    if !DirectionKind::is_structural(direction) {
        return Ok(());
    }

    let Some(parent_coord) = coord.parent() else {
        // non-root coordinates always have a parent
        return Ok(());
    };
    let parent = tx
        .get_node_by_coord(&parent_coord)
        .ok_or_else(|| ConstraintViolation::IncompleteAncestry {
            coord: coord.encode(),
        })?;
    validate_type_for_create(&parent.node_type, new_type, direction)
}

/// Reject PUBLIC visibility when any ancestor is PRIVATE
///
/// Walks the ancestor chain without any visibility filtering: the check must
/// see every ancestor regardless of who is asking. A missing ancestor is a
/// hard failure here, never a transient state, because an unverifiable chain
/// cannot prove the invariant.
pub fn validate_visibility_inheritance(
    tx: &dyn StoreTx,
    coord: &Coord,
    target: Visibility,
) -> Result<(), ConstraintViolation> {
    if !target.is_public() {
        return Ok(());
    }
    let mut cursor = coord.parent();
    while let Some(ancestor_coord) = cursor {
        let ancestor = tx.get_node_by_coord(&ancestor_coord).ok_or_else(|| {
            ConstraintViolation::IncompleteAncestry {
                coord: coord.encode(),
            }
        })?;
        if ancestor.visibility == Visibility::Private {
            return Err(ConstraintViolation::VisibilityInheritance {
                ancestor: ancestor_coord.encode(),
            });
        }
        cursor = ancestor_coord.parent();
    }
    Ok(())
}

/// Visibility mutations are permitted only for the owning user or an
/// internal requester
pub fn validate_ownership(requester: &Requester, owner_id: u64) -> Result<(), ConstraintViolation> {
    match requester {
        Requester::Internal => Ok(()),
        Requester::User(id) if *id == owner_id => Ok(()),
        Requester::User(_) => Err(ConstraintViolation::Ownership {
            requester: requester.label(),
            owner_id,
        }),
    }
}
