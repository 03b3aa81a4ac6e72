//! Store Error Types
//!
//! Error cases for store operations. The coordinate-uniqueness variants are
//! the backstop that turns a racing write into a retryable transaction
//! failure instead of silent corruption.

use thiserror::Error;

/// Store operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No node with the given id
    #[error("Node not found in store: {id}")]
    NodeNotFound { id: String },

    /// No content payload with the given id
    #[error("Content payload not found in store: {id}")]
    ContentNotFound { id: String },

    /// A node already occupies the coordinate (uniqueness backstop)
    #[error("Coordinate already occupied: {coord}")]
    CoordinateOccupied { coord: String },

    /// A record with the given id already exists
    #[error("Duplicate id in store: {id}")]
    DuplicateId { id: String },
}

impl StoreError {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    pub fn content_not_found(id: impl Into<String>) -> Self {
        Self::ContentNotFound { id: id.into() }
    }

    pub fn coordinate_occupied(coord: impl Into<String>) -> Self {
        Self::CoordinateOccupied {
            coord: coord.into(),
        }
    }

    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }
}
