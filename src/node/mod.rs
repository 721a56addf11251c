//! Node lifecycle
//!
//! The external node binary, per-node handles with their deterministic
//! ports, and the manager that initialises and launches them in order.

pub mod binary;
pub mod handle;
pub mod lifecycle;

pub use binary::{CommandOutput, GethBinary, LaunchSpec, NodeBinary};
pub use handle::{NodeHandle, NodeState, PortPlan};
pub use lifecycle::{LifecycleManager, NodeLayout};
