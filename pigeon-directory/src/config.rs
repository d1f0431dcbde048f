use std::sync::Arc;

use serde::Deserialize;

use crate::{
    backends::StaticDirectory, directory::Directory, error::Result, verifier::CredentialVerifier,
};

/// One configured account
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub uid: String,
    /// SHA-256 of the account secret, hex encoded
    pub secret_sha256: String,
}

impl Account {
    #[must_use]
    pub fn new(uid: impl Into<String>, secret_sha256: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            secret_sha256: secret_sha256.into(),
        }
    }
}

/// Which directory backs the credential verifier
///
/// ```ron
/// Pigeon (
///     directory: (
///         type: "Static",
///         accounts: [
///             (uid: "alice", secret_sha256: "a71a7c7011f53a1bab3642ec2ce12593f05230ace8de1e3e7645f69efac1443d"),
///         ],
///     ),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum DirectoryConfig {
    /// Accounts listed in the configuration file
    Static {
        #[serde(default)]
        accounts: Vec<Account>,
    },
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self::Static {
            accounts: Vec::new(),
        }
    }
}

impl DirectoryConfig {
    /// Construct the configured directory
    ///
    /// # Errors
    /// If the configured accounts are invalid
    pub fn build(&self) -> Result<Arc<dyn Directory>> {
        match self {
            Self::Static { accounts } => Ok(Arc::new(StaticDirectory::new(accounts.clone())?)),
        }
    }

    /// Construct the configured directory wrapped in a verifier
    ///
    /// # Errors
    /// If the configured accounts are invalid
    pub fn verifier(&self) -> Result<CredentialVerifier> {
        self.build().map(CredentialVerifier::new)
    }
}
