//! HexMap Core Engine
//!
//! This crate provides the tree mutation and addressing engine for the HexMap
//! system: hexagonally-addressed forests of typed nodes, one node per
//! coordinate, with invariant-preserving atomic operations.
//!
//! # Architecture
//!
//! - **Coordinate addressing**: every node occupies a unique
//!   `(owner, group, path)` coordinate; paths are sequences of hex directions
//! - **Store abstraction**: the engine consumes the [`db::MapStore`] trait,
//!   not a concrete database; an in-memory backend ships with the crate
//! - **Transactional mutations**: create/move/copy/remove run inside one
//!   store transaction per call and roll back as a unit
//!
//! # Modules
//!
//! - [`models`] - Data structures (Coord, MapNode, ContentPayload)
//! - [`db`] - Store abstraction and the in-memory backend
//! - [`services`] - Query, validation, and mutation services

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::*;
pub use models::*;
pub use services::*;
