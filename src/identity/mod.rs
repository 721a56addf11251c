//! Node identities
//!
//! Account addresses, the per-node unlock credential, and the provisioner
//! that asks the node binary for one fresh key pair per node.

pub mod address;
pub mod credential;
pub mod provisioner;

pub use address::{Address, ADDRESS_LEN};
pub use credential::{Credential, CREDENTIAL_FILE};
pub use provisioner::{Account, IdentityProvisioner};
