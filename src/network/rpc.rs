use crate::error::{ProvisionError, Result};
use data_encoding::HEXLOWER_PERMISSIVE;
use log::debug;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const ENODE_SCHEME: &str = "enode://";
const NODE_ID_HEX_LEN: usize = 128;
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Self-description returned by `admin_nodeInfo`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub enode: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "listenAddr")]
    pub listen_addr: Option<String>,
}

/// A node's connectable network address: public key plus host and port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enode {
    pub public_key: String,
    pub host: String,
    pub port: u16,
    raw: String,
}

impl Enode {
    /// The exact string the node reported, as handed to `admin_addPeer`
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Enode {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ProvisionError::InvalidEnode(s.to_string());

        let rest = s.strip_prefix(ENODE_SCHEME).ok_or_else(invalid)?;
        let (public_key, endpoint) = rest.split_once('@').ok_or_else(invalid)?;
        if public_key.len() != NODE_ID_HEX_LEN
            || HEXLOWER_PERMISSIVE.decode(public_key.as_bytes()).is_err()
        {
            return Err(invalid());
        }

        // drop any `?discport=` style query
        let endpoint = endpoint.split('?').next().unwrap_or(endpoint);
        let (host, port) = endpoint.rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        if host.is_empty() || port == 0 {
            return Err(invalid());
        }

        Ok(Enode {
            public_key: public_key.to_string(),
            host: host.to_string(),
            port,
            raw: s.to_string(),
        })
    }
}

impl fmt::Display for Enode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Administrative API exposed by every node on its RPC port
pub trait AdminRpc {
    fn node_info(&self, port: u16) -> Result<NodeInfo>;

    /// Ask the node on `port` to connect to `enode`
    fn add_peer(&self, port: u16, enode: &str) -> Result<bool>;

    /// Whether the RPC port currently accepts connections
    fn is_reachable(&self, port: u16) -> bool;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 over HTTP against `http://<host>:<port>`
pub struct HttpAdminRpc {
    host: String,
    client: Client,
    next_id: AtomicU64,
}

impl HttpAdminRpc {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            host: host.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    fn call<T: DeserializeOwned>(&self, port: u16, method: &str, params: Value) -> Result<T> {
        let url = format!("http://{}:{port}", self.host);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("[rpc] {url} {method}");

        let response: JsonRpcResponse<T> = self
            .client
            .post(&url)
            .json(&request)
            .send()?
            .error_for_status()?
            .json()?;

        match response {
            JsonRpcResponse {
                error: Some(err), ..
            } => Err(ProvisionError::Rpc(format!(
                "{method} on port {port} failed: {} (code {})",
                err.message, err.code
            ))),
            JsonRpcResponse {
                result: Some(result),
                ..
            } => Ok(result),
            _ => Err(ProvisionError::Rpc(format!(
                "{method} on port {port} returned no result"
            ))),
        }
    }

    fn socket_addrs(&self, port: u16) -> Vec<SocketAddr> {
        (self.host.as_str(), port)
            .to_socket_addrs()
            .map(|addrs| addrs.collect())
            .unwrap_or_default()
    }
}

impl AdminRpc for HttpAdminRpc {
    fn node_info(&self, port: u16) -> Result<NodeInfo> {
        self.call(port, "admin_nodeInfo", json!([]))
    }

    fn add_peer(&self, port: u16, enode: &str) -> Result<bool> {
        self.call(port, "admin_addPeer", json!([enode]))
    }

    fn is_reachable(&self, port: u16) -> bool {
        self.socket_addrs(port)
            .iter()
            .any(|addr| TcpStream::connect_timeout(addr, CONNECT_TIMEOUT).is_ok())
    }
}
