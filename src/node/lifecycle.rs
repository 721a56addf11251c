use crate::config::Config;
use crate::error::{ProvisionError, Result, Stage};
use crate::identity::Account;
use crate::network::{wait_until_ready, AdminRpc};
use crate::node::{LaunchSpec, NodeBinary, NodeHandle, NodeState, PortPlan};
use log::{error, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;

const MAX_DIR_BUMPS: u64 = 1000;

/// Directories of one node inside a cluster directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLayout {
    pub node_dir: PathBuf,
    pub datadir: PathBuf,
}

/// Owns node directories and processes from allocation until start
pub struct LifecycleManager<'a> {
    binary: &'a dyn NodeBinary,
    config: &'a Config,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(binary: &'a dyn NodeBinary, config: &'a Config) -> Self {
        Self { binary, config }
    }

    /// Create `<nodes_dir>/cluster_<stamp>`, bumping the stamp if taken
    pub fn allocate_cluster_dir(&self, stamp: u64) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.nodes_dir)?;
        let mut stamp = stamp;
        for _ in 0..MAX_DIR_BUMPS {
            let dir = self.config.nodes_dir.join(format!("cluster_{stamp}"));
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => stamp += 1,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ProvisionError::Io(format!(
            "No free cluster directory in {}",
            self.config.nodes_dir.display()
        )))
    }

    /// Create `node<i>/data` for every member
    pub fn allocate_nodes(&self, cluster_dir: &Path, count: usize) -> Result<Vec<NodeLayout>> {
        (1..=count)
            .map(|index| {
                let node_dir = cluster_dir.join(format!("node{index}"));
                let datadir = node_dir.join("data");
                fs::create_dir_all(&datadir).map_err(|e| {
                    ProvisionError::setup(Stage::Account, Some(index), format!("mkdir: {e}"))
                })?;
                Ok(NodeLayout { node_dir, datadir })
            })
            .collect()
    }

    /// Pair each layout with its account; every handle starts `created`
    pub fn create_handles(
        &self,
        layouts: Vec<NodeLayout>,
        accounts: Vec<Account>,
    ) -> Result<Vec<NodeHandle>> {
        if layouts.len() != accounts.len() {
            return Err(ProvisionError::setup(
                Stage::Account,
                None,
                format!("{} directories but {} accounts", layouts.len(), accounts.len()),
            ));
        }
        let ports = PortPlan::new(self.config.http_base_port, self.config.p2p_base_port);
        layouts
            .into_iter()
            .zip(accounts)
            .map(|(layout, account)| {
                NodeHandle::new(layout.node_dir, layout.datadir, account, &ports)
            })
            .collect()
    }

    /// Initialise every datadir from the genesis file
    ///
    /// Stops at the first failure; no node is started after a failed init.
    pub fn init_all(&self, nodes: &mut [NodeHandle], genesis: &Path) -> Result<()> {
        for node in nodes.iter_mut() {
            let index = node.index();
            let output = self
                .binary
                .init(node.datadir(), genesis)
                .map_err(|e| ProvisionError::setup(Stage::Init, Some(index), e))?;
            if !output.success {
                error!("[init] node {index} stderr: {}", output.stderr.trim());
                let reason = output.describe();
                node.fail(Stage::Init, reason.clone())?;
                return Err(ProvisionError::setup(Stage::Init, Some(index), reason));
            }
            node.advance(Stage::Init, NodeState::Initialized)?;
            info!("[init] node {index} initialised from {}", genesis.display());
        }
        Ok(())
    }

    /// Launch every initialised node, one after another
    ///
    /// A follower that cannot be launched, exits, or never opens its RPC port
    /// is marked failed and the rest continue. The same on node 1 is fatal.
    pub fn start_all(&self, nodes: &mut [NodeHandle], rpc: &dyn AdminRpc) -> Result<()> {
        for node in nodes.iter_mut() {
            if node.state() != &NodeState::Initialized {
                continue;
            }
            if let Err(reason) = self.start_one(node, rpc) {
                let index = node.index();
                node.fail(Stage::Start, reason.clone())?;
                if node.is_bootstrap() {
                    return Err(ProvisionError::setup(Stage::Start, Some(index), reason));
                }
                warn!("[start node {index}] marked failed: {reason}");
            }
        }
        Ok(())
    }

    fn start_one(
        &self,
        node: &mut NodeHandle,
        rpc: &dyn AdminRpc,
    ) -> std::result::Result<(), String> {
        let spec = LaunchSpec {
            index: node.index(),
            datadir: node.datadir().clone(),
            network_id: self.config.network_id,
            rpc_host: self.config.rpc_host.clone(),
            rpc_port: node.rpc_port(),
            p2p_port: node.p2p_port(),
            unlock: node.address(),
            password_file: node.account().password_file.clone(),
            log_file: node.log_file(),
        };
        let pid = self.binary.launch(&spec).map_err(|e| e.to_string())?;
        node.set_pid(pid);

        thread::sleep(self.config.settle_delay());
        if !self.binary.is_running(pid) {
            return Err(format!(
                "process {pid} exited, see {}",
                spec.log_file.display()
            ));
        }
        if !wait_until_ready(
            rpc,
            node.rpc_port(),
            self.config.readiness_timeout(),
            self.config.readiness_poll(),
        ) {
            return Err(format!(
                "RPC port {} not reachable within {:?}",
                node.rpc_port(),
                self.config.readiness_timeout()
            ));
        }

        node.advance(Stage::Start, NodeState::Started)
            .map_err(|e| e.to_string())?;
        info!(
            "[start node {}] ready on RPC port {}",
            node.index(),
            node.rpc_port()
        );
        Ok(())
    }
}
