//! Business Services
//!
//! This module contains the engine's service layer:
//!
//! - `QueryService` - tree traversal and context assembly
//! - `validation` - the constraint rule set (types, visibility, ownership)
//! - `MutationService` - atomic create/update/move/copy/remove operations
//!
//! Services coordinate between the store layer and the business rules,
//! keeping every mutation inside a single transaction boundary.

pub mod error;
pub mod mutation_service;
pub mod query_service;
pub mod validation;

pub use error::{ConstraintViolation, MapServiceError};
pub use mutation_service::{CreateNodeParams, MutationService};
pub use query_service::{
    Ancestry, ContextStrategy, HexecuteContext, NodePreview, QueryService, TileContext,
};
pub use validation::{
    type_rules, validate_ownership, validate_type_for_create, validate_type_for_update,
    validate_visibility_inheritance, Requester,
};
