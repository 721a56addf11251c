use crate::error::{ProvisionError, Result};
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const ADDRESS_LEN: usize = 20;
const HEX_LEN: usize = ADDRESS_LEN * 2;

/// A 20-byte account address, rendered as `0x` + 40 lower-case hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Address {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Find the account address in the textual report of the node binary
    ///
    /// Accepts both `Address: {<hex>}` and `Public address of the key: 0x<hex>`.
    pub fn find_in_report(report: &str) -> Option<Address> {
        report
            .lines()
            .filter(|line| line.to_lowercase().contains("address"))
            .find_map(|line| {
                line.split(|c: char| !c.is_ascii_alphanumeric())
                    .map(|token| token.strip_prefix("0x").unwrap_or(token))
                    .filter(|token| token.len() == HEX_LEN)
                    .find_map(|token| token.parse().ok())
            })
    }
}

impl FromStr for Address {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != HEX_LEN {
            return Err(ProvisionError::InvalidAddress(s.to_string()));
        }
        let bytes = HEXLOWER_PERMISSIVE
            .decode(digits.as_bytes())
            .map_err(|_| ProvisionError::InvalidAddress(s.to_string()))?;
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", HEXLOWER.encode(&self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
