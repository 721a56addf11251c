use crate::config::DEFAULT_GAS_LIMIT;
use crate::error::{ProvisionError, Result, Stage};
use crate::identity::{Address, ADDRESS_LEN};
use crate::utils::write_json_unique;
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Zero bytes ahead of the signer list in `extraData`
pub const VANITY_LEN: usize = 32;
/// Zero-filled seal placeholder after the signer list
pub const SEAL_LEN: usize = 65;
/// Block period of the authority round, in seconds
pub const CLIQUE_PERIOD: u64 = 1;
pub const CLIQUE_EPOCH: u64 = 30000;

const ZERO_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliqueConfig {
    pub period: u64,
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EthashConfig {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    pub clique: CliqueConfig,
    pub ethash: EthashConfig,
}

/// The genesis file every node is initialised from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisDescriptor {
    pub config: ChainConfig,
    pub nonce: String,
    pub timestamp: String,
    pub extra_data: String,
    pub gas_limit: String,
    pub difficulty: String,
    #[serde(rename = "mixhash")]
    pub mix_hash: String,
    pub coinbase: String,
    pub alloc: BTreeMap<String, serde_json::Value>,
}

impl GenesisDescriptor {
    /// Signers packed into `extraData`, in order
    pub fn signers(&self) -> Result<Vec<Address>> {
        let digits = self
            .extra_data
            .strip_prefix("0x")
            .ok_or_else(|| ProvisionError::Serialization("extraData lacks 0x".to_string()))?;
        let bytes = HEXLOWER_PERMISSIVE
            .decode(digits.as_bytes())
            .map_err(|e| ProvisionError::Serialization(format!("extraData is not hex: {e}")))?;
        decode_signers(&bytes)
    }

    /// Write the descriptor as `genesis_<stamp>.json` without replacing any
    /// existing genesis file
    pub fn write(&self, out_dir: &Path, stamp: u64) -> Result<PathBuf> {
        let (path, _) = write_json_unique(out_dir, "genesis", stamp, self)
            .map_err(|e| ProvisionError::setup(Stage::Genesis, None, e))?;
        info!("[genesis] written to {}", path.display());
        Ok(path)
    }
}

/// `vanity(32 zero bytes) || signer_1 .. signer_n || seal(65 zero bytes)`
pub fn encode_extra_data(signers: &[Address]) -> Vec<u8> {
    let mut extra = Vec::with_capacity(VANITY_LEN + ADDRESS_LEN * signers.len() + SEAL_LEN);
    extra.extend_from_slice(&[0u8; VANITY_LEN]);
    for signer in signers {
        extra.extend_from_slice(signer.as_bytes());
    }
    extra.extend_from_slice(&[0u8; SEAL_LEN]);
    extra
}

pub fn decode_signers(extra: &[u8]) -> Result<Vec<Address>> {
    let fixed = VANITY_LEN + SEAL_LEN;
    if extra.len() < fixed || (extra.len() - fixed) % ADDRESS_LEN != 0 {
        return Err(ProvisionError::Serialization(format!(
            "extraData length {} does not fit the signer layout",
            extra.len()
        )));
    }
    Ok(extra[VANITY_LEN..extra.len() - SEAL_LEN]
        .chunks_exact(ADDRESS_LEN)
        .map(|chunk| {
            let mut bytes = [0u8; ADDRESS_LEN];
            bytes.copy_from_slice(chunk);
            Address::from_bytes(bytes)
        })
        .collect())
}

/// Builds the authority-round genesis for a fixed signer set
pub struct GenesisBuilder {
    chain_id: u64,
    gas_limit: u64,
}

impl GenesisBuilder {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn build(&self, signers: &[Address]) -> Result<GenesisDescriptor> {
        if signers.is_empty() {
            return Err(ProvisionError::setup(
                Stage::Genesis,
                None,
                "the authority set is empty",
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = signers.iter().find(|s| !seen.insert(**s)) {
            return Err(ProvisionError::setup(
                Stage::Genesis,
                None,
                format!("signer {dup} appears twice"),
            ));
        }

        Ok(GenesisDescriptor {
            config: ChainConfig {
                chain_id: self.chain_id,
                clique: CliqueConfig {
                    period: CLIQUE_PERIOD,
                    epoch: CLIQUE_EPOCH,
                },
                ethash: EthashConfig::default(),
            },
            nonce: "0x0".to_string(),
            timestamp: "0x0".to_string(),
            extra_data: format!("0x{}", HEXLOWER.encode(&encode_extra_data(signers))),
            gas_limit: format!("{:#x}", self.gas_limit),
            difficulty: "0x1".to_string(),
            mix_hash: ZERO_HASH.to_string(),
            coinbase: ZERO_ADDRESS.to_string(),
            alloc: BTreeMap::new(),
        })
    }
}
