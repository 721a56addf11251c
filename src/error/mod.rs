//! Error handling for cluster provisioning
//!
//! Lower-level failures (exit codes, RPC transport errors, file I/O) are
//! converted at each component boundary into one of the run-level kinds:
//! fatal setup errors, partial peering, or persistence failures.

use crate::provision::ProvisionOutcome;
use std::fmt;
use std::path::PathBuf;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Pipeline step a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Account,
    Genesis,
    Init,
    Start,
    Discover,
    Peer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Account => "account",
            Stage::Genesis => "genesis",
            Stage::Init => "init",
            Stage::Start => "start",
            Stage::Discover => "discover",
            Stage::Peer => "peer",
        };
        f.write_str(name)
    }
}

/// Error kinds surfaced by a provisioning run
#[derive(Debug)]
pub enum ProvisionError {
    /// A failure that aborts the run before a cluster record is produced
    Setup {
        stage: Stage,
        node: Option<usize>,
        reason: String,
    },
    /// One or more followers could not be peered with the bootstrap node
    PartialPeering { failed: Vec<usize> },
    /// The cluster record could not be written; nodes keep running and the
    /// run's outcome is handed back unsaved
    Persistence {
        path: PathBuf,
        reason: String,
        outcome: Box<ProvisionOutcome>,
    },
    /// Invalid configuration
    Config(String),
    /// File I/O errors
    Io(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Administrative RPC transport or protocol errors
    Rpc(String),
    /// Malformed account address
    InvalidAddress(String),
    /// Malformed node network address
    InvalidEnode(String),
}

impl ProvisionError {
    pub fn setup(stage: Stage, node: Option<usize>, reason: impl fmt::Display) -> Self {
        ProvisionError::Setup {
            stage,
            node,
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable name used in structured responses
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionError::Setup { .. } => "fatal_setup",
            ProvisionError::PartialPeering { .. } => "partial_peering",
            ProvisionError::Persistence { .. } => "persistence",
            ProvisionError::Config(_) => "config",
            ProvisionError::Io(_) => "io",
            ProvisionError::Serialization(_) => "serialization",
            ProvisionError::Rpc(_) => "rpc",
            ProvisionError::InvalidAddress(_) => "invalid_address",
            ProvisionError::InvalidEnode(_) => "invalid_enode",
        }
    }
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionError::Setup {
                stage,
                node: Some(node),
                reason,
            } => write!(f, "Setup failed at {stage} on node {node}: {reason}"),
            ProvisionError::Setup {
                stage,
                node: None,
                reason,
            } => write!(f, "Setup failed at {stage}: {reason}"),
            ProvisionError::PartialPeering { failed } => {
                write!(f, "Peering failed for nodes {failed:?}")
            }
            ProvisionError::Persistence { path, reason, .. } => {
                write!(
                    f,
                    "Could not persist cluster record to {}: {reason}",
                    path.display()
                )
            }
            ProvisionError::Config(msg) => write!(f, "Configuration error: {msg}"),
            ProvisionError::Io(msg) => write!(f, "I/O error: {msg}"),
            ProvisionError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            ProvisionError::Rpc(msg) => write!(f, "RPC error: {msg}"),
            ProvisionError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            ProvisionError::InvalidEnode(enode) => write!(f, "Invalid enode: {enode}"),
        }
    }
}

impl std::error::Error for ProvisionError {}

impl From<std::io::Error> for ProvisionError {
    fn from(err: std::io::Error) -> Self {
        ProvisionError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        ProvisionError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ProvisionError {
    fn from(err: toml::de::Error) -> Self {
        ProvisionError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for ProvisionError {
    fn from(err: reqwest::Error) -> Self {
        ProvisionError::Rpc(err.to_string())
    }
}
