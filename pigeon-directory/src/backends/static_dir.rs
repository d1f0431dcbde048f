use std::{collections::BTreeMap, ops::Bound};

use async_trait::async_trait;

use crate::{
    auth::{is_digest, verify_secret},
    config::Account,
    directory::Directory,
    error::{DirectoryError, Result},
};

/// A directory whose accounts come from configuration
///
/// Secrets are held as SHA-256 digests only.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    accounts: BTreeMap<String, String>,
}

impl StaticDirectory {
    /// Build a directory from configured accounts.
    ///
    /// # Errors
    /// - If a uid is empty or appears twice
    /// - If a secret is not a hex encoded SHA-256 digest
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Result<Self> {
        let mut directory = BTreeMap::new();

        for Account { uid, secret_sha256 } in accounts {
            if uid.is_empty() {
                return Err(DirectoryError::InvalidConfiguration(
                    "account uid cannot be empty".to_string(),
                ));
            }

            if !is_digest(&secret_sha256) {
                return Err(DirectoryError::InvalidConfiguration(format!(
                    "secret for {uid} is not a SHA-256 hex digest"
                )));
            }

            if directory.contains_key(&uid) {
                return Err(DirectoryError::InvalidConfiguration(format!(
                    "duplicate uid {uid}"
                )));
            }

            directory.insert(uid, secret_sha256);
        }

        Ok(Self {
            accounts: directory,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<bool> {
        Ok(self
            .accounts
            .get(identity)
            .is_some_and(|digest| verify_secret(secret, digest)))
    }

    async fn search(&self, identity: &str) -> Result<usize> {
        Ok(self
            .accounts
            .range::<str, _>((Bound::Included(identity), Bound::Unbounded))
            .take_while(|(uid, _)| uid.starts_with(identity))
            .count())
    }
}
