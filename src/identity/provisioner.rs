use crate::error::{ProvisionError, Result, Stage};
use crate::identity::{Address, Credential, CREDENTIAL_FILE};
use crate::node::NodeBinary;
use log::info;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One node's signing identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Ordinal of the owning node, starting at 1
    pub index: usize,
    pub address: Address,
    pub password_file: PathBuf,
}

/// Creates one account per node through the node binary
pub struct IdentityProvisioner<'a> {
    binary: &'a dyn NodeBinary,
}

impl<'a> IdentityProvisioner<'a> {
    pub fn new(binary: &'a dyn NodeBinary) -> Self {
        Self { binary }
    }

    /// Create an account in each data directory, in order
    ///
    /// Any failure, including a repeated address, aborts the whole set.
    pub fn provision(&self, datadirs: &[PathBuf]) -> Result<Vec<Account>> {
        let mut seen = HashSet::new();
        let mut accounts = Vec::with_capacity(datadirs.len());

        for (offset, datadir) in datadirs.iter().enumerate() {
            let index = offset + 1;
            let account = self.provision_one(index, datadir)?;
            if !seen.insert(account.address) {
                return Err(ProvisionError::setup(
                    Stage::Account,
                    Some(index),
                    format!("address {} was already issued", account.address),
                ));
            }
            info!("[node {index}] created account {}", account.address);
            accounts.push(account);
        }

        Ok(accounts)
    }

    fn provision_one(&self, index: usize, datadir: &Path) -> Result<Account> {
        let fail = |reason: String| ProvisionError::setup(Stage::Account, Some(index), reason);

        let password_file = datadir.join(CREDENTIAL_FILE);
        Credential::generate()
            .write_to(&password_file)
            .map_err(|e| fail(format!("could not store credential: {e}")))?;

        let output = self
            .binary
            .new_account(datadir, &password_file)
            .map_err(|e| fail(e.to_string()))?;
        if !output.success {
            return Err(fail(output.describe()));
        }

        let report = output.combined();
        let address = Address::find_in_report(&report)
            .ok_or_else(|| fail(format!("no address in output: {}", report.trim())))?;

        Ok(Account {
            index,
            address,
            password_file,
        })
    }
}
