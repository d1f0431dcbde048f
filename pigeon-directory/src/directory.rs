use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::Result;

/// An account directory
///
/// This is the request/response contract of the directory service: a bind
/// with an identity and a secret, and a search that counts the accounts whose
/// uid starts with an identity (the `(uid=<identity>*)` filter).
#[async_trait]
pub trait Directory: Send + Sync + Debug {
    /// Attempt to bind as `identity` using `secret`.
    ///
    /// # Errors
    /// If the directory could not answer
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<bool>;

    /// Count the accounts whose uid starts with `identity`.
    ///
    /// # Errors
    /// If the directory could not answer
    async fn search(&self, identity: &str) -> Result<usize>;
}
