use crate::config::Config;
use crate::error::{ProvisionError, Result, Stage};
use crate::genesis::GenesisBuilder;
use crate::identity::{Address, IdentityProvisioner};
use crate::network::{AdminRpc, ConvergenceProtocol, PeerOutcome, RetryPolicy};
use crate::node::{LifecycleManager, NodeBinary, NodeHandle};
use crate::storage::{ClusterRecord, ClusterRegistry};
use crate::utils::current_timestamp;
use log::{error, info, warn};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// What the caller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub num_nodes: usize,
    /// Overrides the configured chain id when set
    pub chain_id: Option<u64>,
}

impl ProvisionRequest {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            chain_id: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }
}

/// Final view of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub index: usize,
    pub address: Address,
    pub dir: PathBuf,
    pub rpc_port: u16,
    pub p2p_port: u16,
    pub pid: Option<u32>,
    pub state: String,
}

impl From<&NodeHandle> for NodeSummary {
    fn from(node: &NodeHandle) -> Self {
        NodeSummary {
            index: node.index(),
            address: node.address(),
            dir: node.node_dir().clone(),
            rpc_port: node.rpc_port(),
            p2p_port: node.p2p_port(),
            pid: node.pid(),
            state: node.state().to_string(),
        }
    }
}

/// A completed run; peering may still be partial
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    #[serde(rename = "meta")]
    pub record: ClusterRecord,
    #[serde(rename = "meta_path")]
    pub record_path: PathBuf,
    pub cluster_dir: PathBuf,
    pub bootstrap_enode: String,
    pub nodes: Vec<NodeSummary>,
    pub peers: Vec<PeerOutcome>,
}

impl ProvisionOutcome {
    /// The followers that were not peered, as a reportable error
    pub fn partial_peering(&self) -> Option<ProvisionError> {
        let failed: Vec<usize> = self
            .peers
            .iter()
            .filter(|p| !p.added)
            .map(|p| p.node)
            .collect();
        if failed.is_empty() {
            None
        } else {
            Some(ProvisionError::PartialPeering { failed })
        }
    }
}

/// Runs the whole bootstrap sequence for one cluster
///
/// accounts -> genesis -> init (all) -> start (all) -> converge -> record.
/// Steps never overlap and nothing is rolled back on failure.
pub struct Provisioner<'a> {
    config: &'a Config,
    binary: &'a dyn NodeBinary,
    rpc: &'a dyn AdminRpc,
}

impl<'a> Provisioner<'a> {
    pub fn new(config: &'a Config, binary: &'a dyn NodeBinary, rpc: &'a dyn AdminRpc) -> Self {
        Self {
            config,
            binary,
            rpc,
        }
    }

    pub fn provision(&self, request: ProvisionRequest) -> Result<ProvisionOutcome> {
        let num_nodes = request.num_nodes;
        let chain_id = request.chain_id.unwrap_or(self.config.chain_id);
        self.config.validate(num_nodes)?;

        let started_at = current_timestamp()?;
        info!("[provision] {num_nodes} node(s), chain id {chain_id}");

        let lifecycle = LifecycleManager::new(self.binary, self.config);
        let cluster_dir = lifecycle.allocate_cluster_dir(started_at)?;
        let layouts = lifecycle.allocate_nodes(&cluster_dir, num_nodes)?;

        let datadirs: Vec<PathBuf> = layouts.iter().map(|l| l.datadir.clone()).collect();
        let accounts = IdentityProvisioner::new(self.binary).provision(&datadirs)?;
        let signers: Vec<Address> = accounts.iter().map(|a| a.address).collect();
        info!("[provision] signer addresses: {signers:?}");

        let genesis = GenesisBuilder::new(chain_id)
            .with_gas_limit(self.config.gas_limit)
            .build(&signers)?;
        fs::create_dir_all(&self.config.out_dir)
            .map_err(|e| ProvisionError::setup(Stage::Genesis, None, e))?;
        let genesis_path = genesis.write(&self.config.out_dir, started_at)?;

        let mut nodes = lifecycle.create_handles(layouts, accounts)?;
        lifecycle.init_all(&mut nodes, &genesis_path)?;
        lifecycle.start_all(&mut nodes, self.rpc)?;

        let retry = RetryPolicy::new(
            self.config.discovery_attempts,
            self.config.discovery_delay(),
        );
        let report = ConvergenceProtocol::new(self.rpc, retry).converge(&nodes)?;
        let failed = report.failed_nodes();
        if !failed.is_empty() {
            warn!("[provision] nodes without bootstrap peer: {failed:?}");
        }

        let record = ClusterRecord {
            timestamp: started_at,
            num_nodes,
            signers,
            genesis: genesis_path,
            pids: nodes.iter().map(|n| n.pid()).collect(),
        };
        let registry = ClusterRegistry::new(&self.config.out_dir);
        let mut outcome = ProvisionOutcome {
            record_path: registry.record_path(record.timestamp),
            record,
            cluster_dir,
            bootstrap_enode: report.bootstrap.to_string(),
            nodes: nodes.iter().map(NodeSummary::from).collect(),
            peers: report.peers,
        };

        match registry.persist(&mut outcome.record) {
            Ok(path) => {
                outcome.record_path = path;
                Ok(outcome)
            }
            Err(e) => {
                error!("[provision] cluster record not saved: {e}");
                outcome.record_path = registry.record_path(outcome.record.timestamp);
                Err(ProvisionError::Persistence {
                    path: outcome.record_path.clone(),
                    reason: e.to_string(),
                    outcome: Box::new(outcome),
                })
            }
        }
    }
}
