//! Fakes recording every call they receive

use crate::config::Config;
use crate::error::{ProvisionError, Result, Stage};
use crate::identity::{Account, Address};
use crate::network::{AdminRpc, NodeInfo};
use crate::node::{CommandOutput, LaunchSpec, NodeBinary, NodeHandle, NodeState, PortPlan};
use data_encoding::HEXLOWER;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const TEST_RPC_BASE: u16 = 8545;
pub const TEST_P2P_BASE: u16 = 30303;

/// Config rooted in `root` with no waiting anywhere
pub fn test_config(root: &Path) -> Config {
    Config {
        nodes_dir: root.join("nodes"),
        out_dir: root.join("out"),
        http_base_port: TEST_RPC_BASE,
        p2p_base_port: TEST_P2P_BASE,
        settle_delay_ms: 0,
        readiness_timeout_ms: 0,
        readiness_poll_ms: 0,
        discovery_attempts: 3,
        discovery_delay_ms: 0,
        ..Config::default()
    }
}

/// `count` handles already in the `started` state
pub fn started_nodes(count: usize) -> Vec<NodeHandle> {
    let ports = PortPlan::new(TEST_RPC_BASE, TEST_P2P_BASE);
    (1..=count)
        .map(|index| {
            let node_dir = PathBuf::from(format!("/fake/node{index}"));
            let account = Account {
                index,
                address: Address::from_bytes([index as u8; 20]),
                password_file: node_dir.join("data/pw.txt"),
            };
            let mut node =
                NodeHandle::new(node_dir.clone(), node_dir.join("data"), account, &ports).unwrap();
            node.advance(Stage::Init, NodeState::Initialized).unwrap();
            node.set_pid(4000 + index as u32);
            node.advance(Stage::Start, NodeState::Started).unwrap();
            node
        })
        .collect()
}

#[derive(Debug, Clone)]
pub enum NodeCall {
    NewAccount(PathBuf),
    Init { datadir: PathBuf, genesis: PathBuf },
    Launch(LaunchSpec),
}

/// Node binary that answers from a script instead of running anything
#[derive(Default)]
pub struct FakeNodeBinary {
    calls: Mutex<Vec<NodeCall>>,
    garbled_account: Option<usize>,
    failing_account: Option<usize>,
    repeated_address: Option<usize>,
    failing_init: Option<usize>,
    failing_launch: Option<usize>,
    exiting: HashSet<usize>,
}

impl FakeNodeBinary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nth account report carries no address
    pub fn with_garbled_account(mut self, nth: usize) -> Self {
        self.garbled_account = Some(nth);
        self
    }

    pub fn with_failing_account(mut self, nth: usize) -> Self {
        self.failing_account = Some(nth);
        self
    }

    /// The nth account gets the same address as the first
    pub fn with_repeated_address(mut self, nth: usize) -> Self {
        self.repeated_address = Some(nth);
        self
    }

    pub fn with_failing_init(mut self, nth: usize) -> Self {
        self.failing_init = Some(nth);
        self
    }

    pub fn with_failing_launch(mut self, index: usize) -> Self {
        self.failing_launch = Some(index);
        self
    }

    /// Node `index` dies right after launch
    pub fn with_exiting_node(mut self, index: usize) -> Self {
        self.exiting.insert(index);
        self
    }

    pub fn calls(&self) -> Vec<NodeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn init_calls(&self) -> usize {
        self.count(|c| matches!(c, NodeCall::Init { .. }))
    }

    pub fn launch_calls(&self) -> usize {
        self.count(|c| matches!(c, NodeCall::Launch(_)))
    }

    fn count(&self, pred: impl Fn(&NodeCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: NodeCall) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        let last = calls.last().unwrap();
        calls
            .iter()
            .filter(|c| std::mem::discriminant(*c) == std::mem::discriminant(last))
            .count()
    }

    pub fn address_for(nth: usize) -> Address {
        let mut bytes = [0xa0; 20];
        bytes[18] = (nth >> 8) as u8;
        bytes[19] = nth as u8;
        Address::from_bytes(bytes)
    }

    fn pid_for(index: usize) -> u32 {
        4000 + index as u32
    }
}

impl NodeBinary for FakeNodeBinary {
    fn new_account(&self, datadir: &Path, _password_file: &Path) -> Result<CommandOutput> {
        let nth = self.record(NodeCall::NewAccount(datadir.to_path_buf()));
        if self.failing_account == Some(nth) {
            return Ok(CommandOutput {
                code: Some(1),
                success: false,
                stdout: String::new(),
                stderr: "Fatal: could not create keystore".to_string(),
            });
        }
        let stdout = if self.garbled_account == Some(nth) {
            "Your new key was generated\n".to_string()
        } else {
            let address = if self.repeated_address == Some(nth) {
                Self::address_for(1)
            } else {
                Self::address_for(nth)
            };
            format!("Public address of the key:   {address}\n")
        };
        Ok(CommandOutput {
            code: Some(0),
            success: true,
            stdout,
            stderr: String::new(),
        })
    }

    fn init(&self, datadir: &Path, genesis: &Path) -> Result<CommandOutput> {
        let nth = self.record(NodeCall::Init {
            datadir: datadir.to_path_buf(),
            genesis: genesis.to_path_buf(),
        });
        let failed = self.failing_init == Some(nth);
        Ok(CommandOutput {
            code: Some(if failed { 1 } else { 0 }),
            success: !failed,
            stdout: String::new(),
            stderr: if failed {
                "Fatal: invalid genesis file".to_string()
            } else {
                String::new()
            },
        })
    }

    fn launch(&self, spec: &LaunchSpec) -> Result<u32> {
        self.record(NodeCall::Launch(spec.clone()));
        if self.failing_launch == Some(spec.index) {
            return Err(ProvisionError::Io("spawn failed".to_string()));
        }
        Ok(Self::pid_for(spec.index))
    }

    fn is_running(&self, pid: u32) -> bool {
        !self.exiting.iter().any(|index| Self::pid_for(*index) == pid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcCall {
    NodeInfo { port: u16 },
    AddPeer { port: u16, enode: String },
}

/// Administrative RPC answering from a script
#[derive(Default)]
pub struct FakeAdminRpc {
    calls: Mutex<Vec<RpcCall>>,
    probes: Mutex<HashMap<u16, usize>>,
    failing_node_info: usize,
    empty_enode: usize,
    rejecting: HashSet<u16>,
    erroring: HashSet<u16>,
    late: HashMap<u16, usize>,
    dead: HashSet<u16>,
}

impl FakeAdminRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `count` node_info calls fail
    pub fn failing_node_info(mut self, count: usize) -> Self {
        self.failing_node_info = count;
        self
    }

    /// The first `count` node_info calls report an empty enode
    pub fn empty_enode_for(mut self, count: usize) -> Self {
        self.empty_enode = count;
        self
    }

    pub fn rejecting_peer(mut self, port: u16) -> Self {
        self.rejecting.insert(port);
        self
    }

    pub fn erroring_peer(mut self, port: u16) -> Self {
        self.erroring.insert(port);
        self
    }

    /// `port` refuses the first `probes` reachability checks
    pub fn unreachable_for(mut self, port: u16, probes: usize) -> Self {
        self.late.insert(port, probes);
        self
    }

    pub fn never_reachable(mut self, port: u16) -> Self {
        self.dead.insert(port);
        self
    }

    pub fn enode_for(&self, rpc_port: u16) -> String {
        let id = HEXLOWER.encode(&[rpc_port as u8; 64]);
        let p2p = TEST_P2P_BASE + (rpc_port - TEST_RPC_BASE);
        format!("enode://{id}@127.0.0.1:{p2p}")
    }

    pub fn calls(&self) -> Vec<RpcCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn node_info_calls(&self) -> usize {
        self.count(|c| matches!(c, RpcCall::NodeInfo { .. }))
    }

    pub fn add_peer_calls(&self) -> usize {
        self.count(|c| matches!(c, RpcCall::AddPeer { .. }))
    }

    pub fn reachability_probes(&self, port: u16) -> usize {
        self.probes.lock().unwrap().get(&port).copied().unwrap_or(0)
    }

    fn count(&self, pred: impl Fn(&RpcCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

impl AdminRpc for FakeAdminRpc {
    fn node_info(&self, port: u16) -> Result<NodeInfo> {
        self.calls.lock().unwrap().push(RpcCall::NodeInfo { port });
        let nth = self.node_info_calls();
        if nth <= self.failing_node_info {
            return Err(ProvisionError::Rpc("connection refused".to_string()));
        }
        let enode = if nth <= self.failing_node_info + self.empty_enode {
            String::new()
        } else {
            self.enode_for(port)
        };
        Ok(NodeInfo {
            enode,
            ..NodeInfo::default()
        })
    }

    fn add_peer(&self, port: u16, enode: &str) -> Result<bool> {
        self.calls.lock().unwrap().push(RpcCall::AddPeer {
            port,
            enode: enode.to_string(),
        });
        if self.erroring.contains(&port) {
            return Err(ProvisionError::Rpc("method not found".to_string()));
        }
        Ok(!self.rejecting.contains(&port))
    }

    fn is_reachable(&self, port: u16) -> bool {
        let mut probes = self.probes.lock().unwrap();
        let seen = probes.entry(port).or_insert(0);
        *seen += 1;
        if self.dead.contains(&port) {
            return false;
        }
        *seen > self.late.get(&port).copied().unwrap_or(0)
    }
}
