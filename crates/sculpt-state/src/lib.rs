//! SCULPT State - Versioned model store
//!
//! This crate implements the model history:
//! - Immutable snapshots shared through `Arc`
//! - Append-only store with an optimistic head check
//! - Lineage and history queries
//! - Persisted record layout with content digests

pub mod snapshot;
pub mod store;
pub mod persist;

pub use snapshot::*;
pub use store::*;
pub use persist::*;
