use std::{sync::Arc, time::Duration};

use pigeon_common::{config::SessionTimeouts, error::ProtocolError};
use pigeon_directory::CredentialVerifier;
use pigeon_store::Mailstore;
use serde::Deserialize;

/// Name used in the welcome banner when none is configured
pub const DEFAULT_BANNER: &str = "pigeon";

/// Failed login policy for a session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LockoutConfig {
    /// Consecutive failures before the session is locked out.
    ///
    /// Default: 3
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// How long a locked out session refuses logins.
    ///
    /// Default: 60 seconds
    #[serde(default = "defaults::lockout_secs")]
    pub lockout_secs: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            lockout_secs: defaults::lockout_secs(),
        }
    }
}

impl LockoutConfig {
    #[must_use]
    pub const fn new(max_attempts: u32, lockout_secs: u64) -> Self {
        Self {
            max_attempts,
            lockout_secs,
        }
    }

    #[must_use]
    pub const fn lockout(&self) -> Duration {
        Duration::from_secs(self.lockout_secs)
    }

    /// # Errors
    /// If `max_attempts` is zero
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.max_attempts == 0 {
            return Err(ProtocolError::InvalidConfiguration {
                field: "lockout.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Per-listener arguments for the mail protocol.
///
/// `banner`, `lockout` and `timeouts` come from configuration; the store and
/// the verifier are runtime resources injected before the listener starts.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MailArgs {
    #[serde(default)]
    pub(crate) banner: Option<String>,
    #[serde(default)]
    pub(crate) lockout: LockoutConfig,
    #[serde(default)]
    pub(crate) timeouts: SessionTimeouts,
    #[serde(skip)]
    pub(crate) store: Option<Arc<Mailstore>>,
    #[serde(skip)]
    pub(crate) verifier: Option<CredentialVerifier>,
}

impl MailArgs {
    #[must_use]
    pub fn builder() -> Self {
        Self::default()
    }

    /// Set the mail store sessions read and write
    #[must_use]
    pub fn with_store(mut self, store: Arc<Mailstore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the verifier used for logins and receiver lookups
    #[must_use]
    pub fn with_verifier(mut self, verifier: CredentialVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Set the server name shown in the welcome banner
    #[must_use]
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    #[must_use]
    pub const fn with_lockout(mut self, lockout: LockoutConfig) -> Self {
        self.lockout = lockout;
        self
    }

    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: SessionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn banner(&self) -> &str {
        self.banner.as_deref().unwrap_or(DEFAULT_BANNER)
    }

    #[must_use]
    pub const fn lockout(&self) -> &LockoutConfig {
        &self.lockout
    }

    #[must_use]
    pub const fn timeouts(&self) -> &SessionTimeouts {
        &self.timeouts
    }
}

mod defaults {
    pub const fn max_attempts() -> u32 {
        3
    }

    pub const fn lockout_secs() -> u64 {
        60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_defaults() {
        let lockout = LockoutConfig::default();

        assert_eq!(lockout.max_attempts, 3);
        assert_eq!(lockout.lockout(), Duration::from_secs(60));
        assert!(lockout.validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = LockoutConfig::new(0, 60).validate().unwrap_err();

        assert!(matches!(
            err,
            ProtocolError::InvalidConfiguration { ref field, .. } if field == "lockout.max_attempts"
        ));
    }

    #[test]
    fn test_banner_default() {
        assert_eq!(MailArgs::builder().banner(), DEFAULT_BANNER);
        assert_eq!(MailArgs::builder().with_banner("TWMailer").banner(), "TWMailer");
    }
}
