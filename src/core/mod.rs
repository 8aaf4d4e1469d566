//! Core business logic - framework-agnostic catalog and composition graph operations.
//! Everything here works against a `SeaORM` connection and returns structured data
//! that the API layer serializes.

/// Component edges and the values derived from them
pub mod composition;
/// In-memory composition graph and its traversals
pub mod graph;
/// Fixed-point helpers for prices, quantities and the idiot index
pub mod pricing;
/// Product catalog CRUD
pub mod product;
