//! Durable run artifacts
//!
//! The append-only cluster registry and listing of provisioned node
//! directories.

pub mod registry;

pub use registry::{list_node_dirs, ClusterRecord, ClusterRegistry, NodeEntry};
