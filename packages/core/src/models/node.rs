//! Node Data Structures
//!
//! The `MapNode` struct is the tree bookkeeping record: coordinate, type,
//! visibility, and a reference to the content payload it owns. Content lives
//! in a separate [`super::ContentPayload`] so duplication can stamp a fresh
//! payload without re-deriving tree state.
//!
//! # Type hierarchy
//!
//! - `User` nodes are forest roots (empty path, no parent)
//! - structural descendants of `System` are all `System`, structural
//!   descendants of `Context` are all `Context`
//! - `Organizational` nodes only sit under `User` or `Organizational` parents
//! - custom tags bypass the hierarchy rules entirely
//!
//! The rule table itself lives in `services::validation`.

use crate::models::Coord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Node item type: a closed built-in set plus extensible custom tags
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum NodeType {
    /// Forest root; one per (owner, group)
    User,
    /// Grouping node; only under User or Organizational parents
    Organizational,
    /// Context subtree; structural descendants stay Context
    Context,
    /// System subtree; structural descendants stay System
    System,
    /// Extension tag; exempt from hierarchy rules
    Custom(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::User => "user",
            NodeType::Organizational => "organizational",
            NodeType::Context => "context",
            NodeType::System => "system",
            NodeType::Custom(tag) => tag,
        }
    }

    /// Whether this is one of the closed built-in types
    pub fn is_builtin(&self) -> bool {
        !matches!(self, NodeType::Custom(_))
    }

    /// Whether setting this type cascades onto structural descendants
    pub fn cascades(&self) -> bool {
        matches!(self, NodeType::System | NodeType::Context)
    }
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => NodeType::User,
            "organizational" => NodeType::Organizational,
            "context" => NodeType::Context,
            "system" => NodeType::System,
            _ => NodeType::Custom(value),
        }
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node visibility; PUBLIC requires every ancestor to be PUBLIC as well
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

/// Tree node record
///
/// Position, type, and visibility are the only observable state at this
/// layer; there is no status field, no soft-delete, and no draft/published
/// split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapNode {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Coordinate within the owner/group forest; unique per forest
    pub coord: Coord,

    /// Parent node id; `None` only for forest roots
    pub parent_id: Option<String>,

    /// Item type (creation-validated, cascade-updated)
    pub node_type: NodeType,

    pub visibility: Visibility,

    /// Weak back-reference to the node this one was copied from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,

    /// Id of the content payload this node exclusively owns
    pub content_ref: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

impl MapNode {
    /// Create a new node record with a generated UUID
    pub fn new(
        coord: Coord,
        parent_id: Option<String>,
        node_type: NodeType,
        visibility: Visibility,
        content_ref: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            coord,
            parent_id,
            node_type,
            visibility,
            origin_id: None,
            content_ref,
            created_at: now,
            modified_at: now,
        }
    }

    /// Create a forest root node for an owner/group pair
    pub fn new_root(owner_id: u64, group_id: u64, content_ref: String) -> Self {
        Self::new(
            Coord::root(owner_id, group_id),
            None,
            NodeType::User,
            Visibility::Private,
            content_ref,
        )
    }

    /// The direction kind this node occupies under its parent, if any
    pub fn direction(&self) -> Option<i8> {
        self.coord.direction()
    }

    pub fn is_root(&self) -> bool {
        self.coord.is_root()
    }
}
