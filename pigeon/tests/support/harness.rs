//! End-to-end test harness for Pigeon
//!
//! This module provides a self-contained test harness that starts a complete
//! Pigeon instance from RON configuration, with a temporary mail root and a
//! static directory.
//!
//! # Example
//!
//! ```no_run
//! use support::harness::E2ETestHarness;
//!
//! #[tokio::test]
//! async fn test_login() {
//!     let harness = E2ETestHarness::builder()
//!         .with_account("alice", "wonderland")
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let client = harness.login("alice", "wonderland").await.unwrap();
//!     client.quit().await.unwrap();
//!
//!     harness.shutdown().await.unwrap();
//! }
//! ```

use std::{fmt::Write, net::SocketAddr, path::Path, time::Duration};

use pigeon_common::Signal;
use pigeon_directory::auth::hash_secret;
use pigeon_mail::client::MailClient;
use tokio::{sync::broadcast, task::JoinHandle, time::timeout};

/// End-to-end test harness for Pigeon
///
/// The server is configured exactly as the binary would be, from RON text,
/// and runs in the same process as the test.
pub struct E2ETestHarness {
    /// Address the mail listener is bound to
    address: SocketAddr,

    /// Handle for the mail controller task
    handle: JoinHandle<anyhow::Result<()>>,

    /// Shutdown signal broadcaster
    shutdown_tx: broadcast::Sender<Signal>,

    /// Mail root, removed when the harness is dropped
    root: tempfile::TempDir,
}

impl E2ETestHarness {
    /// Create a new builder for configuring the test harness
    #[must_use]
    pub fn builder() -> E2ETestHarnessBuilder {
        E2ETestHarnessBuilder::default()
    }

    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }

    #[must_use]
    pub fn mail_root(&self) -> &Path {
        self.root.path()
    }

    /// Connect a new client and read the banner
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    pub async fn connect(&self) -> anyhow::Result<MailClient> {
        Ok(MailClient::connect(self.address).await?)
    }

    /// Connect and log in, failing if the credentials are rejected
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or rejects the login.
    pub async fn login(&self, identity: &str, secret: &str) -> anyhow::Result<MailClient> {
        let mut client = self.connect().await?;
        anyhow::ensure!(
            client.login(identity, secret).await?,
            "login as {identity} was rejected"
        );
        Ok(client)
    }

    /// Broadcast shutdown and wait for the controller to finish draining
    ///
    /// # Errors
    ///
    /// Returns an error if the controller fails or does not stop in time.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.shutdown_tx.send(Signal::Shutdown)?;
        timeout(Duration::from_secs(10), self.handle).await???;
        Ok(())
    }
}

/// Builder for [`E2ETestHarness`]
#[derive(Debug, Default)]
pub struct E2ETestHarnessBuilder {
    accounts: Vec<(String, String)>,
    max_sessions: Option<usize>,
    lockout: Option<(u32, u64)>,
}

impl E2ETestHarnessBuilder {
    /// Add a directory account with a plaintext secret
    #[must_use]
    pub fn with_account(mut self, uid: impl Into<String>, secret: impl Into<String>) -> Self {
        self.accounts.push((uid.into(), secret.into()));
        self
    }

    /// Cap the number of concurrent sessions
    #[must_use]
    pub const fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = Some(max_sessions);
        self
    }

    /// Override the failed login policy
    #[must_use]
    pub const fn with_lockout(mut self, max_attempts: u32, lockout_secs: u64) -> Self {
        self.lockout = Some((max_attempts, lockout_secs));
        self
    }

    fn config(&self, address: SocketAddr, root: &Path) -> String {
        let mut accounts = String::new();
        for (uid, secret) in &self.accounts {
            let _ = write!(
                accounts,
                r#"(uid: "{uid}", secret_sha256: "{}"),"#,
                hash_secret(secret)
            );
        }

        let max_sessions = self
            .max_sessions
            .map_or_else(|| "None".to_string(), |max| format!("Some({max})"));
        let (max_attempts, lockout_secs) = self.lockout.unwrap_or((3, 60));

        format!(
            r#"(
                mail: (
                    listeners: [(
                        socket: "{address}",
                        max_sessions: {max_sessions},
                        drain_timeout_secs: Some(5),
                        args: (
                            banner: Some("pigeon-e2e"),
                            lockout: (max_attempts: {max_attempts}, lockout_secs: {lockout_secs}),
                        ),
                    )],
                ),
                store: (root: "{}"),
                directory: (type: "Static", accounts: [{accounts}]),
            )"#,
            root.display()
        )
    }

    /// Build and start the test harness
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is rejected or the server does
    /// not start accepting connections.
    pub async fn build(self) -> anyhow::Result<E2ETestHarness> {
        let root = tempfile::tempdir()?;

        // Reserve a port, then release it for the listener to bind
        let address = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?;

        let pigeon = pigeon::config::parse(&self.config(address, root.path()))?;
        let mail = pigeon.prepare().await?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
        let handle = tokio::spawn(mail.control(shutdown_rx));

        let mut ready = false;
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(address).await.is_ok() {
                ready = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::ensure!(ready, "server did not start listening on {address}");

        Ok(E2ETestHarness {
            address,
            handle,
            shutdown_tx,
            root,
        })
    }
}
