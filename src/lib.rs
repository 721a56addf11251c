//! # Clique Provisioner - My Private Proof-of-Authority Cluster Builder
//!
//! This is the tool I use to stand up a private clique network on one machine.
//! When I come back to this code, here's what I need to remember:
//!
//! ## What It Does
//! - **Identities**: one fresh account per node, each unlocked by its own secret
//! - **Genesis**: the signer set packed into `extraData`, written once per run
//! - **Nodes**: every datadir initialised before any node is launched
//! - **Convergence**: node 1's enode discovered with bounded retry, then handed to
//!   every follower through `admin_addPeer`
//! - **Registry**: an append-only JSON record for every run
//!
//! ## How I Organized My Code
//! - `identity/`: account addresses, unlock credentials, account creation
//! - `genesis/`: `extraData` signer encoding and the genesis file
//! - `node/`: the external node binary, node handles, init/start sequencing
//! - `network/`: administrative RPC, readiness polling, bootstrap peering
//! - `storage/`: the append-only cluster registry and directory listing
//! - `provision/`: the end-to-end run and its structured response
//! - `config/`: explicit settings for a run
//! - `utils/`: timestamps, JSON files, heartbeat
//! - `cli/`: command-line surface
//!
//! ## Key Decisions I Made
//! - A run is strictly sequential; I never overlap steps
//! - Nothing is rolled back: directories and processes from a failed run stay
//!   in place so I can inspect them
//! - Peering is best effort, so a partial mesh is still a successful run
//! - Settings are passed in explicitly, so tests get their own directories
//!
//! ## When I Need to Understand Something
//! 1. Start with `main.rs` to see the CLI commands
//! 2. Look at `provision/pipeline.rs` for the order of the whole run
//! 3. Check `network/convergence.rs` for how the mesh is seeded

pub mod cli;
pub mod config;
pub mod error;
pub mod genesis;
pub mod identity;
pub mod network;
pub mod node;
pub mod provision;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use error::{ProvisionError, Result, Stage};
pub use genesis::{encode_extra_data, GenesisBuilder, GenesisDescriptor};
pub use identity::{Account, Address, Credential, IdentityProvisioner};
pub use network::{
    AdminRpc, ConvergenceProtocol, ConvergenceReport, Enode, HttpAdminRpc, NodeInfo, PeerOutcome,
    RetryPolicy,
};
pub use node::{GethBinary, LifecycleManager, NodeBinary, NodeHandle, NodeState, PortPlan};
pub use provision::{ProvisionOutcome, ProvisionRequest, Provisioner};
pub use storage::{list_node_dirs, ClusterRecord, ClusterRegistry};
pub use utils::Heartbeat;
