use crate::error::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use zeroize::Zeroizing;

pub const CREDENTIAL_FILE: &str = "pw.txt";
const CREDENTIAL_LEN: usize = 32;

/// Secret that unlocks one node's account
///
/// The value is wiped from memory on drop.
pub struct Credential {
    secret: Zeroizing<String>,
}

impl Credential {
    pub fn generate() -> Credential {
        let secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CREDENTIAL_LEN)
            .map(char::from)
            .collect();
        Credential {
            secret: Zeroizing::new(secret),
        }
    }

    pub fn expose(&self) -> &str {
        self.secret.as_str()
    }

    /// Write the secret followed by a newline, readable by the owner only
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(self.secret.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_generated_credentials_differ() {
        let a = Credential::generate();
        let b = Credential::generate();
        assert_eq!(a.expose().len(), CREDENTIAL_LEN);
        assert!(a.expose().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a.expose(), b.expose());
    }

    #[test]
    fn test_debug_hides_secret() {
        let credential = Credential::generate();
        assert!(!format!("{credential:?}").contains(credential.expose()));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CREDENTIAL_FILE);
        let credential = Credential::generate();
        credential.write_to(&path).unwrap();

        let stored = fs::read_to_string(&path).unwrap();
        assert_eq!(stored, format!("{}\n", credential.expose()));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
