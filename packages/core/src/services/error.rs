//! Service Layer Error Types
//!
//! Mutation entry points are strict and return these errors; traversal
//! helpers degrade gracefully instead (missing data yields `None` or partial
//! results, since "no parent yet" is an expected transient state).

use crate::db::StoreError;
use crate::models::CoordParseError;
use thiserror::Error;

/// A business-rule violation
///
/// Every variant names the rule that failed; the service wraps these in
/// [`MapServiceError::Constraint`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// Type-hierarchy rule table rejected the parent/child pairing
    #[error("Type hierarchy violation: {parent} cannot have structural child {child}")]
    TypeHierarchy { parent: String, child: String },

    /// A PUBLIC node may not have a PRIVATE ancestor
    #[error("Visibility inheritance violation: ancestor {ancestor} is private")]
    VisibilityInheritance { ancestor: String },

    /// Visibility mutations are owner-only (or internal)
    #[error("Requester {requester} does not own map {owner_id}")]
    Ownership { requester: String, owner_id: u64 },

    /// User nodes live at the forest root and never move or change type
    #[error("User nodes are fixed at the forest root: {context}")]
    UserAtRootOnly { context: String },

    /// Create requires the coordinate to be a direct child of the parent
    #[error("Coordinate {coord} is not a direct child of parent {parent}")]
    NotDirectChild { coord: String, parent: String },

    /// Source and destination are the same coordinate
    #[error("Source and destination coordinates are both {coord}")]
    SelfTargeted { coord: String },

    /// Source and destination belong to different owner/group forests
    #[error("Coordinates {a} and {b} belong to different forests")]
    CrossForest { a: String, b: String },

    /// One coordinate lies inside the other's subtree
    #[error("Coordinates overlap: {from} and {dest} share a slot chain")]
    OverlappingMove { from: String, dest: String },

    /// Copy destination already holds a node
    #[error("Destination coordinate {coord} is already occupied")]
    DestinationOccupied { coord: String },

    /// A collision could not be legally displaced
    #[error("No free displacement slot under {parent}")]
    NoDisplacementSlot { parent: String },

    /// An ancestor lookup failed where every ancestor must be seen
    #[error("Ancestry of {coord} is incomplete; cannot verify inheritance")]
    IncompleteAncestry { coord: String },
}

/// Service operation errors
#[derive(Error, Debug)]
pub enum MapServiceError {
    /// Node not found by id at a mutation entry point
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// No node at a coordinate a mutation requires to be occupied
    #[error("No node at coordinate: {coord}")]
    CoordinateNotFound { coord: String },

    /// Malformed coordinate string
    #[error("Invalid coordinate: {0}")]
    Parse(#[from] CoordParseError),

    /// Business-rule violation
    #[error("Constraint violated: {0}")]
    Constraint(#[from] ConstraintViolation),

    /// A mid-sequence failure inside a multi-step mutation; the whole
    /// operation rolled back and the cause is surfaced here
    #[error("{op} aborted, transaction rolled back: {source}")]
    TransactionAborted {
        op: &'static str,
        #[source]
        source: Box<MapServiceError>,
    },

    /// Store operation failed
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl MapServiceError {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    pub fn coordinate_not_found(coord: impl Into<String>) -> Self {
        Self::CoordinateNotFound {
            coord: coord.into(),
        }
    }

    pub fn transaction_aborted(op: &'static str, source: MapServiceError) -> Self {
        Self::TransactionAborted {
            op,
            source: Box::new(source),
        }
    }

    /// The originating cause of an aborted transaction, unwrapped
    pub fn root_cause(&self) -> &MapServiceError {
        match self {
            Self::TransactionAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
