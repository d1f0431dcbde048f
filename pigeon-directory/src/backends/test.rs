use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::{
    directory::Directory,
    error::{DirectoryError, Result},
};

/// Testing directory
///
/// Accounts are kept in plaintext, every call is counted, and the whole
/// directory can be switched off to simulate an outage.
#[derive(Debug, Default)]
pub struct TestDirectory {
    accounts: BTreeMap<String, String>,
    authenticate_calls: AtomicUsize,
    search_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl TestDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_account(mut self, uid: impl Into<String>, secret: impl Into<String>) -> Self {
        self.accounts.insert(uid.into(), secret.into());
        self
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `authenticate` calls seen so far
    pub fn authenticate_calls(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
    }

    /// Number of `search` calls seen so far
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DirectoryError::Unavailable("test directory switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Directory for TestDirectory {
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<bool> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        Ok(self.accounts.get(identity).is_some_and(|s| s == secret))
    }

    async fn search(&self, identity: &str) -> Result<usize> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        Ok(self
            .accounts
            .keys()
            .filter(|uid| uid.starts_with(identity))
            .count())
    }
}
