use crate::error::{ProvisionError, Result, Stage};
use crate::network::{AdminRpc, Enode};
use crate::node::NodeHandle;
use log::{info, warn};
use serde::Serialize;
use std::thread;
use std::time::Duration;

/// Bounded retry for bootstrap address discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// Result of asking one follower to connect to the bootstrap node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerOutcome {
    pub node: usize,
    pub added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceReport {
    pub bootstrap: Enode,
    pub peers: Vec<PeerOutcome>,
}

impl ConvergenceReport {
    /// Followers that did not end up peered
    pub fn failed_nodes(&self) -> Vec<usize> {
        self.peers
            .iter()
            .filter(|p| !p.added)
            .map(|p| p.node)
            .collect()
    }
}

/// Seeds every follower with the bootstrap node's address
pub struct ConvergenceProtocol<'a> {
    rpc: &'a dyn AdminRpc,
    retry: RetryPolicy,
}

impl<'a> ConvergenceProtocol<'a> {
    pub fn new(rpc: &'a dyn AdminRpc, retry: RetryPolicy) -> Self {
        Self { rpc, retry }
    }

    /// Discover node 1's address, then peer every other started node with it
    pub fn converge(&self, nodes: &[NodeHandle]) -> Result<ConvergenceReport> {
        let bootstrap = nodes
            .iter()
            .find(|n| n.is_bootstrap())
            .ok_or_else(|| ProvisionError::setup(Stage::Discover, Some(1), "no bootstrap node"))?;
        let enode = self.discover_bootstrap(bootstrap)?;
        info!("[provision] boot enode: {enode}");

        let followers: Vec<&NodeHandle> = nodes.iter().filter(|n| !n.is_bootstrap()).collect();
        let peers = self.peer_followers(&followers, &enode);
        Ok(ConvergenceReport {
            bootstrap: enode,
            peers,
        })
    }

    /// Poll `admin_nodeInfo` on the bootstrap node until it reports a usable
    /// enode or the retry budget runs out
    pub fn discover_bootstrap(&self, bootstrap: &NodeHandle) -> Result<Enode> {
        if !bootstrap.is_started() {
            return Err(ProvisionError::setup(
                Stage::Discover,
                Some(bootstrap.index()),
                format!("bootstrap node is {}", bootstrap.state()),
            ));
        }

        let port = bootstrap.rpc_port();
        let mut last_error = String::from("no attempt made");
        for attempt in 1..=self.retry.attempts {
            match self.rpc.node_info(port) {
                Ok(info) => match info.enode.parse::<Enode>() {
                    Ok(enode) => return Ok(enode),
                    Err(e) => last_error = e.to_string(),
                },
                Err(e) => last_error = e.to_string(),
            }
            warn!(
                "Bootstrap discovery attempt {attempt}/{} failed: {last_error}",
                self.retry.attempts
            );
            if attempt < self.retry.attempts {
                thread::sleep(self.retry.delay);
            }
        }

        Err(ProvisionError::setup(
            Stage::Discover,
            Some(bootstrap.index()),
            format!(
                "no enode from RPC port {port} after {} attempts: {last_error}",
                self.retry.attempts
            ),
        ))
    }

    /// One `admin_addPeer` per follower; failures are recorded, never retried
    pub fn peer_followers(&self, followers: &[&NodeHandle], enode: &Enode) -> Vec<PeerOutcome> {
        followers
            .iter()
            .map(|node| {
                let outcome = self.peer_one(node, enode);
                info!(
                    "[provision] add_peer node{} <- boot : {}",
                    outcome.node, outcome.added
                );
                outcome
            })
            .collect()
    }

    fn peer_one(&self, node: &NodeHandle, enode: &Enode) -> PeerOutcome {
        let index = node.index();
        if !node.is_started() {
            return PeerOutcome {
                node: index,
                added: false,
                error: Some(format!("node is {}", node.state())),
            };
        }

        match self.rpc.add_peer(node.rpc_port(), enode.as_str()) {
            Ok(true) => PeerOutcome {
                node: index,
                added: true,
                error: None,
            },
            Ok(false) => PeerOutcome {
                node: index,
                added: false,
                error: Some("admin_addPeer returned false".to_string()),
            },
            Err(e) => {
                warn!("[add_peer_via_rpc error] node {index}: {e}");
                PeerOutcome {
                    node: index,
                    added: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
