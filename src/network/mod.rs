//! Administrative RPC and cluster convergence
//!
//! Talks to running nodes over their RPC ports: readiness probing, bootstrap
//! address discovery, and seeding followers with the bootstrap peer.

pub mod convergence;
pub mod readiness;
pub mod rpc;

pub use convergence::{ConvergenceProtocol, ConvergenceReport, PeerOutcome, RetryPolicy};
pub use readiness::wait_until_ready;
pub use rpc::{AdminRpc, Enode, HttpAdminRpc, NodeInfo};
