//! Data Models
//!
//! This module contains the core data structures used throughout HexMap:
//!
//! - `Coord` - hexagonal coordinate addressing a node within a forest
//! - `MapNode` - tree node carrying type, visibility, and a content reference
//! - `ContentPayload` - the content owned by exactly one node
//!
//! Coordinates are the primary addressing scheme; the node's string id exists
//! for repository bookkeeping and origin back-references only.

mod content;
mod coordinate;
mod node;

pub use content::{ContentFields, ContentPatch, ContentPayload};
pub use coordinate::{Coord, CoordParseError, DirectionKind};
pub use node::{MapNode, NodeType, Visibility};
