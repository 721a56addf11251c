use crate::error::{ProvisionError, Result, Stage};
use crate::identity::{Account, Address};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of one cluster member: `created -> initialized -> started`, with
/// `failed` reachable from any live state and terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Created,
    Initialized,
    Started,
    Failed { reason: String },
}

impl NodeState {
    fn may_become(&self, next: &NodeState) -> bool {
        matches!(
            (self, next),
            (NodeState::Created, NodeState::Initialized)
                | (NodeState::Initialized, NodeState::Started)
                | (
                    NodeState::Created | NodeState::Initialized | NodeState::Started,
                    NodeState::Failed { .. }
                )
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Created => write!(f, "created"),
            NodeState::Initialized => write!(f, "initialized"),
            NodeState::Started => write!(f, "started"),
            NodeState::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

/// Deterministic port layout: `base + (index - 1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPlan {
    pub rpc_base: u16,
    pub p2p_base: u16,
}

impl PortPlan {
    pub fn new(rpc_base: u16, p2p_base: u16) -> Self {
        Self { rpc_base, p2p_base }
    }

    pub fn rpc_port(&self, index: usize) -> Result<u16> {
        offset_port(self.rpc_base, index)
    }

    pub fn p2p_port(&self, index: usize) -> Result<u16> {
        offset_port(self.p2p_base, index)
    }
}

fn offset_port(base: u16, index: usize) -> Result<u16> {
    index
        .checked_sub(1)
        .and_then(|offset| u16::try_from(offset).ok())
        .and_then(|offset| base.checked_add(offset))
        .ok_or_else(|| {
            ProvisionError::Config(format!("no port for node {index} from base {base}"))
        })
}

/// One cluster member as seen by the provisioner
#[derive(Debug, Clone)]
pub struct NodeHandle {
    index: usize,
    node_dir: PathBuf,
    datadir: PathBuf,
    account: Account,
    p2p_port: u16,
    rpc_port: u16,
    pid: Option<u32>,
    state: NodeState,
}

impl NodeHandle {
    pub fn new(
        node_dir: PathBuf,
        datadir: PathBuf,
        account: Account,
        ports: &PortPlan,
    ) -> Result<Self> {
        let index = account.index;
        Ok(Self {
            index,
            node_dir,
            datadir,
            p2p_port: ports.p2p_port(index)?,
            rpc_port: ports.rpc_port(index)?,
            account,
            pid: None,
            state: NodeState::Created,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_bootstrap(&self) -> bool {
        self.index == 1
    }

    pub fn node_dir(&self) -> &PathBuf {
        &self.node_dir
    }

    pub fn datadir(&self) -> &PathBuf {
        &self.datadir
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn address(&self) -> Address {
        self.account.address
    }

    pub fn p2p_port(&self) -> u16 {
        self.p2p_port
    }

    pub fn rpc_port(&self) -> u16 {
        self.rpc_port
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn is_started(&self) -> bool {
        self.state == NodeState::Started
    }

    pub fn log_file(&self) -> PathBuf {
        self.node_dir.join(format!("geth_{}.log", self.index))
    }

    pub(crate) fn set_pid(&mut self, pid: u32) {
        self.pid = Some(pid);
    }

    pub(crate) fn advance(&mut self, stage: Stage, next: NodeState) -> Result<()> {
        if !self.state.may_become(&next) {
            return Err(ProvisionError::setup(
                stage,
                Some(self.index),
                format!("cannot move from {} to {next}", self.state),
            ));
        }
        self.state = next;
        Ok(())
    }

    pub(crate) fn fail(&mut self, stage: Stage, reason: impl Into<String>) -> Result<()> {
        self.advance(
            stage,
            NodeState::Failed {
                reason: reason.into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn handle(index: usize) -> NodeHandle {
        let account = Account {
            index,
            address: Address::from_bytes([index as u8; 20]),
            password_file: PathBuf::from(format!("/n/node{index}/data/pw.txt")),
        };
        NodeHandle::new(
            PathBuf::from(format!("/n/node{index}")),
            PathBuf::from(format!("/n/node{index}/data")),
            account,
            &PortPlan::new(8545, 30303),
        )
        .unwrap()
    }

    #[test]
    fn test_port_assignment_is_injective() {
        let plan = PortPlan::new(8545, 30303);
        let n = 12;
        let rpc: HashSet<u16> = (1..=n).map(|i| plan.rpc_port(i).unwrap()).collect();
        let p2p: HashSet<u16> = (1..=n).map(|i| plan.p2p_port(i).unwrap()).collect();
        assert_eq!(rpc.len(), n);
        assert_eq!(p2p.len(), n);
        for i in 1..=n {
            assert_eq!(plan.rpc_port(i).unwrap(), 8545 + (i as u16 - 1));
            assert_eq!(plan.p2p_port(i).unwrap(), 30303 + (i as u16 - 1));
        }
    }

    #[test]
    fn test_port_overflow_and_zero_index() {
        let plan = PortPlan::new(u16::MAX, 30303);
        assert_eq!(plan.rpc_port(1).unwrap(), u16::MAX);
        assert!(plan.rpc_port(2).is_err());
        assert!(plan.p2p_port(0).is_err());
    }

    #[test]
    fn test_handle_layout() {
        let node = handle(3);
        assert_eq!(node.rpc_port(), 8547);
        assert_eq!(node.p2p_port(), 30305);
        assert_eq!(node.log_file(), PathBuf::from("/n/node3/geth_3.log"));
        assert!(!node.is_bootstrap());
        assert!(handle(1).is_bootstrap());
        assert_eq!(node.state(), &NodeState::Created);
        assert_eq!(node.pid(), None);
    }

    #[test]
    fn test_state_machine_order() {
        let mut node = handle(1);
        assert!(node.advance(Stage::Start, NodeState::Started).is_err());
        node.advance(Stage::Init, NodeState::Initialized).unwrap();
        node.advance(Stage::Start, NodeState::Started).unwrap();
        assert!(node.is_started());
        node.fail(Stage::Start, "rpc unreachable").unwrap();
        assert!(node.fail(Stage::Start, "again").is_err());
        assert!(node.advance(Stage::Start, NodeState::Started).is_err());
        assert_eq!(node.state().to_string(), "failed (rpc unreachable)");
    }
}
