use crate::error::{ProvisionError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_NODE_COMMAND: &str = "geth";
const DEFAULT_NETWORK_ID: u64 = 1515;
const DEFAULT_CHAIN_ID: u64 = 1515;
const DEFAULT_HEARTBEAT_SECS: u64 = 18;
pub const DEFAULT_GAS_LIMIT: u64 = 8_000_000;

const NODE_COMMAND_KEY: &str = "GETH_COMMAND";
const NETWORK_ID_KEY: &str = "NETWORK_ID";
const CHAIN_ID_KEY: &str = "CHAIN_ID";
const HEARTBEAT_INTERVAL_KEY: &str = "HEARTBEAT_INTERVAL";

/// Settings for a provisioning run
///
/// Passed explicitly into the pipeline so independent runs (and tests) can
/// use separate directories and port ranges.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path or name of the node binary
    pub node_command: String,
    /// Root for per-run node directories
    pub nodes_dir: PathBuf,
    /// Where genesis files and cluster records are written
    pub out_dir: PathBuf,
    pub network_id: u64,
    pub chain_id: u64,
    pub gas_limit: u64,
    pub rpc_host: String,
    pub http_base_port: u16,
    pub p2p_base_port: u16,
    pub heartbeat_interval_secs: u64,
    /// Pause after launching a node, before readiness polling starts
    pub settle_delay_ms: u64,
    pub readiness_timeout_ms: u64,
    pub readiness_poll_ms: u64,
    pub discovery_attempts: u32,
    pub discovery_delay_ms: u64,
    pub rpc_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            node_command: String::from(DEFAULT_NODE_COMMAND),
            nodes_dir: PathBuf::from("geth_nodes"),
            out_dir: PathBuf::from("out"),
            network_id: DEFAULT_NETWORK_ID,
            chain_id: DEFAULT_CHAIN_ID,
            gas_limit: DEFAULT_GAS_LIMIT,
            rpc_host: String::from("127.0.0.1"),
            http_base_port: 8545,
            p2p_base_port: 30303,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_SECS,
            settle_delay_ms: 2000,
            readiness_timeout_ms: 20_000,
            readiness_poll_ms: 250,
            discovery_attempts: 10,
            discovery_delay_ms: 1000,
            rpc_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            ProvisionError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    /// Apply the environment variables the provisioner has always honoured
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(command) = lookup(NODE_COMMAND_KEY) {
            self.node_command = command;
        }
        if let Some(value) = lookup(NETWORK_ID_KEY) {
            self.network_id = parse_number(NETWORK_ID_KEY, &value)?;
        }
        if let Some(value) = lookup(CHAIN_ID_KEY) {
            self.chain_id = parse_number(CHAIN_ID_KEY, &value)?;
        }
        if let Some(value) = lookup(HEARTBEAT_INTERVAL_KEY) {
            self.heartbeat_interval_secs = parse_number(HEARTBEAT_INTERVAL_KEY, &value)?;
        }
        Ok(())
    }

    /// Check that a run of `num_nodes` nodes can be laid out with these settings
    pub fn validate(&self, num_nodes: usize) -> Result<()> {
        if num_nodes == 0 {
            return Err(ProvisionError::Config(
                "At least one node is required".to_string(),
            ));
        }
        if self.discovery_attempts == 0 {
            return Err(ProvisionError::Config(
                "discovery_attempts must be at least 1".to_string(),
            ));
        }
        for (name, base) in [
            ("http_base_port", self.http_base_port),
            ("p2p_base_port", self.p2p_base_port),
        ] {
            let last = u64::from(base) + (num_nodes as u64 - 1);
            if last > u64::from(u16::MAX) {
                return Err(ProvisionError::Config(format!(
                    "{name} {base} cannot fit {num_nodes} nodes"
                )));
            }
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }

    pub fn discovery_delay(&self) -> Duration {
        Duration::from_millis(self.discovery_delay_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| ProvisionError::Config(format!("{key}={value} is not a number: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_legacy_values() {
        let config = Config::default();
        assert_eq!(config.node_command, "geth");
        assert_eq!(config.network_id, 1515);
        assert_eq!(config.chain_id, 1515);
        assert_eq!(config.http_base_port, 8545);
        assert_eq!(config.p2p_base_port, 30303);
        assert_eq!(config.gas_limit, 8_000_000);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(18));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GETH_COMMAND", "/opt/geth"),
            ("CHAIN_ID", "4242"),
            ("HEARTBEAT_INTERVAL", "5"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.node_command, "/opt/geth");
        assert_eq!(config.chain_id, 4242);
        assert_eq!(config.network_id, 1515);
        assert_eq!(config.heartbeat_interval_secs, 5);
    }

    #[test]
    fn test_env_rejects_non_numeric_ids() {
        let mut config = Config::default();
        let result = config.apply_env(|key| (key == "NETWORK_ID").then(|| "abc".to_string()));
        assert!(matches!(result, Err(ProvisionError::Config(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            chain_id = 77
            nodes_dir = "/tmp/nodes"
            discovery_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.chain_id, 77);
        assert_eq!(config.nodes_dir, PathBuf::from("/tmp/nodes"));
        assert_eq!(config.discovery_attempts, 3);
        assert_eq!(config.http_base_port, 8545);
    }

    #[test]
    fn test_validate() {
        let config = Config::default();
        assert!(config.validate(3).is_ok());
        assert!(config.validate(0).is_err());

        let tight = Config {
            http_base_port: u16::MAX - 1,
            ..Config::default()
        };
        assert!(tight.validate(2).is_ok());
        assert!(tight.validate(3).is_err());

        let no_retries = Config {
            discovery_attempts: 0,
            ..Config::default()
        };
        assert!(no_retries.validate(1).is_err());
    }
}
