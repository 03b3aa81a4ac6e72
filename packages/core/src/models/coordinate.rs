//! Hexagonal Coordinate Addressing
//!
//! A coordinate is `(owner_id, group_id, path)` where `path` is an ordered
//! sequence of hex directions. The empty path denotes the forest root for
//! that owner/group pair.
//!
//! Direction values:
//!
//! - `0` - center slot ("hexplan"), holding a description of the parent's
//!   composition
//! - `1..=6` - structural directions (hierarchical decomposition)
//! - `-1..=-6` - composed directions (attached material, same six spatial
//!   slots, not decomposition)
//!
//! The canonical string encoding `"ownerId,groupId:d1,d2,...,dn"` is the
//! external identifier for a node and the only serialization format this
//! layer owns.
//!
//! # Examples
//!
//! ```rust
//! use hexmap_core::models::Coord;
//!
//! let coord = Coord::decode("7,1:1,-3").unwrap();
//! assert_eq!(coord.owner_id, 7);
//! assert_eq!(coord.path, vec![1, -3]);
//! assert_eq!(coord.encode(), "7,1:1,-3");
//! assert_eq!(coord.parent().unwrap().path, vec![1]);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Parse errors for the coordinate string encoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordParseError {
    #[error("Missing ':' separator in coordinate string: {0}")]
    MissingSeparator(String),

    #[error("Invalid owner/group segment: {0}")]
    InvalidIds(String),

    #[error("Invalid path element: {0}")]
    InvalidPathElement(String),

    #[error("Direction out of range: {0} (expected -6..=6)")]
    DirectionOutOfRange(i8),
}

/// Classification of a single path direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionKind {
    /// Direction 0: the hexplan slot
    Center,
    /// Directions 1..=6: hierarchical decomposition
    Structural,
    /// Directions -1..=-6: attached material
    Composed,
}

impl DirectionKind {
    /// Classify a direction value, rejecting anything outside `-6..=6`
    pub fn classify(direction: i8) -> Result<DirectionKind, CoordParseError> {
        match direction {
            0 => Ok(DirectionKind::Center),
            1..=6 => Ok(DirectionKind::Structural),
            -6..=-1 => Ok(DirectionKind::Composed),
            other => Err(CoordParseError::DirectionOutOfRange(other)),
        }
    }

    /// True for directions `1..=6`
    pub fn is_structural(direction: i8) -> bool {
        (1..=6).contains(&direction)
    }

    /// True for directions `-6..=-1`
    pub fn is_composed(direction: i8) -> bool {
        (-6..=-1).contains(&direction)
    }
}

/// Coordinate of a node within a per-owner/group forest
///
/// `path == []` is the forest root. Each path element addresses one hex slot
/// under the previous node, so a coordinate fully determines the node's
/// position and its entire ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coord {
    pub owner_id: u64,
    pub group_id: u64,
    pub path: Vec<i8>,
}

impl Coord {
    pub fn new(owner_id: u64, group_id: u64, path: Vec<i8>) -> Self {
        Self {
            owner_id,
            group_id,
            path,
        }
    }

    /// The forest root for an owner/group pair
    pub fn root(owner_id: u64, group_id: u64) -> Self {
        Self::new(owner_id, group_id, Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Canonical string encoding: `"ownerId,groupId:d1,d2,...,dn"`
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse the canonical string encoding
    pub fn decode(input: &str) -> Result<Self, CoordParseError> {
        input.parse()
    }

    /// Parent coordinate, or `None` at the forest root
    pub fn parent(&self) -> Option<Coord> {
        if self.is_root() {
            return None;
        }
        Some(Coord::new(
            self.owner_id,
            self.group_id,
            self.path[..self.path.len() - 1].to_vec(),
        ))
    }

    /// Child coordinate one direction below this one
    pub fn child(&self, direction: i8) -> Coord {
        debug_assert!((-6..=6).contains(&direction));
        let mut path = self.path.clone();
        path.push(direction);
        Coord::new(self.owner_id, self.group_id, path)
    }

    /// Same coordinate with a replacement path
    pub fn with_path(&self, path: Vec<i8>) -> Coord {
        Coord::new(self.owner_id, self.group_id, path)
    }

    /// The direction this coordinate occupies under its parent
    pub fn direction(&self) -> Option<i8> {
        self.path.last().copied()
    }

    /// The six composed slots directly under this coordinate
    pub fn composed_children(&self) -> [Coord; 6] {
        [-1, -2, -3, -4, -5, -6].map(|d| self.child(d))
    }

    /// Whether both coordinates belong to the same owner/group forest
    pub fn same_forest(&self, other: &Coord) -> bool {
        self.owner_id == other.owner_id && self.group_id == other.group_id
    }

    /// Strict ancestry: same forest and `other`'s path properly extends ours
    pub fn is_ancestor_of(&self, other: &Coord) -> bool {
        self.same_forest(other)
            && other.path.len() > self.path.len()
            && other.path.starts_with(&self.path)
    }

    /// Path suffix of this coordinate relative to an ancestor
    ///
    /// Returns `None` when `ancestor` is not this coordinate or one of its
    /// ancestors.
    pub fn relative_suffix_from(&self, ancestor: &Coord) -> Option<Vec<i8>> {
        if !ancestor.same_forest(self) || !self.path.starts_with(&ancestor.path) {
            return None;
        }
        Some(self.path[ancestor.path.len()..].to_vec())
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .path
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{},{}:{}", self.owner_id, self.group_id, path)
    }
}

impl FromStr for Coord {
    type Err = CoordParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (ids, path_part) = input
            .split_once(':')
            .ok_or_else(|| CoordParseError::MissingSeparator(input.to_string()))?;

        let (owner, group) = ids
            .split_once(',')
            .ok_or_else(|| CoordParseError::InvalidIds(ids.to_string()))?;
        let owner_id: u64 = owner
            .trim()
            .parse()
            .map_err(|_| CoordParseError::InvalidIds(ids.to_string()))?;
        let group_id: u64 = group
            .trim()
            .parse()
            .map_err(|_| CoordParseError::InvalidIds(ids.to_string()))?;

        let mut path = Vec::new();
        if !path_part.is_empty() {
            for element in path_part.split(',') {
                let direction: i8 = element
                    .trim()
                    .parse()
                    .map_err(|_| CoordParseError::InvalidPathElement(element.to_string()))?;
                DirectionKind::classify(direction)?;
                path.push(direction);
            }
        }

        Ok(Coord::new(owner_id, group_id, path))
    }
}
