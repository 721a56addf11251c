use crate::error::{ProvisionError, Result};
use crate::identity::Address;
use crate::utils::{create_new_file, read_json, write_json_into};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const RECORD_PREFIX: &str = "cluster_";
const MAX_NAME_BUMPS: u64 = 1000;

/// Durable summary of one provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Run start, milliseconds since the Unix epoch; also the record's key
    pub timestamp: u64,
    pub num_nodes: usize,
    pub signers: Vec<Address>,
    pub genesis: PathBuf,
    /// Per node, in index order; `None` for a node that never launched
    pub pids: Vec<Option<u32>>,
}

/// Append-only store of cluster records under the output directory
pub struct ClusterRegistry {
    out_dir: PathBuf,
}

impl ClusterRegistry {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Write `record` as `cluster_<timestamp>.json`
    ///
    /// An existing record is never replaced: the timestamp is bumped until
    /// the name is free, so `record` ends up holding the key it was stored
    /// under. A write that fails midway leaves no file behind.
    pub fn persist(&self, record: &mut ClusterRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;
        for _ in 0..MAX_NAME_BUMPS {
            let path = self.record_path(record.timestamp);
            match create_new_file(&path) {
                Ok(file) => {
                    write_json_into(file, &path, record)?;
                    info!("[registry] cluster record written to {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => record.timestamp += 1,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ProvisionError::Io(format!(
            "No free record name in {}",
            self.out_dir.display()
        )))
    }

    /// All readable records, oldest first
    pub fn list(&self) -> Result<Vec<ClusterRecord>> {
        if !self.out_dir.exists() {
            return Ok(vec![]);
        }
        let mut records = vec![];
        for entry in fs::read_dir(&self.out_dir)? {
            let path = entry?.path();
            let is_record = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(RECORD_PREFIX) && n.ends_with(".json"));
            if !is_record {
                continue;
            }
            match read_json::<ClusterRecord>(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable record {}: {e}", path.display()),
            }
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    pub fn record_path(&self, timestamp: u64) -> PathBuf {
        self.out_dir.join(format!("{RECORD_PREFIX}{timestamp}.json"))
    }
}

/// A provisioned node directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeEntry {
    pub cluster: String,
    pub name: String,
    pub path: PathBuf,
}

/// Every `node*` directory under every `cluster_*` directory, sorted
pub fn list_node_dirs(nodes_dir: &Path) -> Result<Vec<NodeEntry>> {
    if !nodes_dir.exists() {
        return Ok(vec![]);
    }
    let mut nodes = vec![];
    for cluster in sorted_dirs(nodes_dir)? {
        let cluster_name = dir_name(&cluster);
        for node in sorted_dirs(&cluster)? {
            nodes.push(NodeEntry {
                cluster: cluster_name.clone(),
                name: dir_name(&node),
                path: node,
            });
        }
    }
    Ok(nodes)
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = vec![];
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
