use std::sync::Arc;

use pigeon_common::internal;

use crate::directory::Directory;

/// What sessions use to check credentials and recipients
///
/// Directory failures are logged and reported as a rejection, so a caller
/// cannot tell an unreachable directory from bad credentials.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    directory: Arc<dyn Directory>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// True iff binding as `identity` with `secret` succeeds.
    #[tracing::instrument(level = "debug", skip(self, secret))]
    pub async fn authenticate(&self, identity: &str, secret: &str) -> bool {
        match self.directory.authenticate(identity, secret).await {
            Ok(accepted) => accepted,
            Err(err) => {
                internal!(level = WARN, "Unable to authenticate {identity}: {err}");
                false
            }
        }
    }

    /// True iff at least one account matches `identity`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn exists(&self, identity: &str) -> bool {
        match self.directory.search(identity).await {
            Ok(matches) => matches > 0,
            Err(err) => {
                internal!(level = WARN, "Unable to look up {identity}: {err}");
                false
            }
        }
    }
}
