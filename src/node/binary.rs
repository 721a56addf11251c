use crate::error::{ProvisionError, Result};
use crate::identity::Address;
use log::{debug, info};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::{Mutex, PoisonError};

const HTTP_APIS: &str = "eth,net,web3,personal,admin";

/// Captured result of a short-lived node binary invocation
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout and stderr joined, the way the account report is scanned
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout.trim(), self.stderr.trim())
    }

    /// One-line description for error messages
    pub fn describe(&self) -> String {
        let code = self
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit status {code}")
        } else {
            format!("exit status {code}: {stderr}")
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Everything the long-running node process is started with
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub index: usize,
    pub datadir: PathBuf,
    pub network_id: u64,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub p2p_port: u16,
    pub unlock: Address,
    pub password_file: PathBuf,
    pub log_file: PathBuf,
}

impl LaunchSpec {
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        args.push("--datadir".into());
        args.push(self.datadir.clone().into_os_string());
        args.push("--networkid".into());
        args.push(self.network_id.to_string().into());
        args.push("--http".into());
        args.push("--http.addr".into());
        args.push(self.rpc_host.clone().into());
        args.push("--http.port".into());
        args.push(self.rpc_port.to_string().into());
        args.push("--http.api".into());
        args.push(HTTP_APIS.into());
        args.push("--port".into());
        args.push(self.p2p_port.to_string().into());
        args.push("--allow-insecure-unlock".into());
        args.push("--unlock".into());
        args.push(self.unlock.to_string().into());
        args.push("--password".into());
        args.push(self.password_file.clone().into_os_string());
        args.push("--mine".into());
        args.push("--miner.threads=1".into());
        args
    }
}

/// The external node program
///
/// Short commands block until exit and report their captured output; `launch`
/// starts a background process and returns its pid.
pub trait NodeBinary {
    /// Create a key pair in `datadir`, protected by the secret in `password_file`
    fn new_account(&self, datadir: &Path, password_file: &Path) -> Result<CommandOutput>;

    /// Initialise `datadir` from the genesis file
    fn init(&self, datadir: &Path, genesis: &Path) -> Result<CommandOutput>;

    fn launch(&self, spec: &LaunchSpec) -> Result<u32>;

    /// Whether a launched process is still alive
    fn is_running(&self, pid: u32) -> bool;
}

/// Invokes a geth-compatible binary with structured argument lists
pub struct GethBinary {
    program: String,
    children: Mutex<HashMap<u32, Child>>,
}

impl GethBinary {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            children: Mutex::new(HashMap::new()),
        }
    }

    fn run(&self, args: Vec<OsString>) -> Result<CommandOutput> {
        debug!("[cmd] {} {:?}", self.program, args);
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ProvisionError::Io(format!("Failed to run {}: {e}", self.program)))?;
        Ok(CommandOutput::from(output))
    }
}

impl NodeBinary for GethBinary {
    fn new_account(&self, datadir: &Path, password_file: &Path) -> Result<CommandOutput> {
        self.run(vec![
            "--datadir".into(),
            datadir.as_os_str().to_owned(),
            "account".into(),
            "new".into(),
            "--password".into(),
            password_file.as_os_str().to_owned(),
        ])
    }

    fn init(&self, datadir: &Path, genesis: &Path) -> Result<CommandOutput> {
        self.run(vec![
            "--datadir".into(),
            datadir.as_os_str().to_owned(),
            "init".into(),
            genesis.as_os_str().to_owned(),
        ])
    }

    fn launch(&self, spec: &LaunchSpec) -> Result<u32> {
        let stdout = File::create(&spec.log_file).map_err(|e| {
            ProvisionError::Io(format!(
                "Failed to create log file {}: {e}",
                spec.log_file.display()
            ))
        })?;
        let stderr = stdout.try_clone()?;
        let args = spec.args();
        debug!("[cmd] {} {:?}", self.program, args);

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        if let Some(node_dir) = spec.log_file.parent() {
            command.current_dir(node_dir);
        }

        let child = command.spawn().map_err(|e| {
            ProvisionError::Io(format!("Failed to spawn {}: {e}", self.program))
        })?;
        let pid = child.id();
        info!(
            "[start node {}] pid={pid} log={}",
            spec.index,
            spec.log_file.display()
        );
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pid, child);
        Ok(pid)
    }

    fn is_running(&self, pid: u32) -> bool {
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        match children.get_mut(&pid) {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}
