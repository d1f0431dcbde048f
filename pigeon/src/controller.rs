use std::sync::{Arc, LazyLock};

use pigeon_common::{
    Signal,
    controller::Controller,
    internal,
    logging::{self, LogConfig},
    tracing,
};
use pigeon_directory::DirectoryConfig;
use pigeon_mail::Mail;
use pigeon_store::StoreConfig;
use serde::Deserialize;
use tokio::sync::broadcast;

#[derive(Debug, Default, Deserialize)]
pub struct Pigeon {
    #[serde(default)]
    mail: Controller<Mail>,
    #[serde(default)]
    store: StoreConfig,
    #[serde(default)]
    directory: DirectoryConfig,
    #[serde(default)]
    logging: LogConfig,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

#[tracing::instrument(level = "trace")]
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    // The listeners normally finish draining first; a second CTRL+C cuts
    // the drain short.
    tokio::signal::ctrl_c().await?;
    internal!(level = WARN, "Forcing shutdown");

    Ok(())
}

impl Pigeon {
    #[must_use]
    pub const fn mail(&self) -> &Controller<Mail> {
        &self.mail
    }

    #[must_use]
    pub const fn store(&self) -> &StoreConfig {
        &self.store
    }

    #[must_use]
    pub const fn directory(&self) -> &DirectoryConfig {
        &self.directory
    }

    #[must_use]
    pub const fn logging(&self) -> &LogConfig {
        &self.logging
    }

    /// Build the runtime resources and hand them to every listener.
    ///
    /// The mail root is created if needed, the directory backend is built
    /// from its configuration, and each listener validates its arguments.
    ///
    /// # Errors
    /// If the mail root cannot be used, the directory configuration is
    /// invalid, or a listener rejects its configuration
    #[tracing::instrument(level = "trace", skip_all, err)]
    pub async fn prepare(self) -> anyhow::Result<Controller<Mail>> {
        let store = Arc::new(self.store.build());
        store.init().await?;
        internal!(level = INFO, "Mail root at {}", store.root().display());

        let verifier = self.directory.verifier()?;

        let mut mail = self.mail;
        mail.map_args(|args| {
            args.with_store(Arc::clone(&store))
                .with_verifier(verifier.clone())
        });
        mail.init()?;

        Ok(mail)
    }

    /// Run this controller, and everything it controls
    ///
    /// # Errors
    ///
    /// This function will return an error if the configuration cannot be
    /// brought up, or a listener fails.
    #[tracing::instrument(level = "trace", skip_all, err)]
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init(&self.logging);

        internal!("Controller running");

        let mail = self.prepare().await?;

        let ret = tokio::select! {
            r = mail.control(SHUTDOWN_BROADCAST.subscribe()) => {
                r
            }
            r = shutdown() => {
                r
            }
        };

        internal!(level = INFO, "Shutting down...");

        ret
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[tokio::test]
    async fn test_prepare_creates_mail_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("mail");

        let config = format!(
            r#"(
                mail: (listeners: [(socket: "127.0.0.1:0")]),
                store: (root: "{}"),
            )"#,
            root.display()
        );
        let pigeon: Pigeon = ron::from_str(&config).unwrap();

        let mail = pigeon.prepare().await.unwrap();

        assert!(root.is_dir());
        assert_eq!(mail.listeners().len(), 1);
    }

    #[tokio::test]
    async fn test_prepare_rejects_file_root() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let config = format!(r#"(store: (root: "{}"))"#, file.path().display());
        let pigeon: Pigeon = ron::from_str(&config).unwrap();

        assert!(pigeon.prepare().await.is_err());
    }

    #[tokio::test]
    async fn test_prepare_rejects_invalid_lockout() {
        let dir = tempfile::tempdir().unwrap();

        let config = format!(
            r#"(
                mail: (listeners: [(
                    socket: "127.0.0.1:0",
                    session: (lockout: (max_attempts: 0)),
                )]),
                store: (root: "{}"),
            )"#,
            dir.path().display()
        );
        let pigeon: Pigeon = ron::from_str(&config).unwrap();

        let err = pigeon.prepare().await.unwrap_err();
        assert!(err.to_string().contains("lockout.max_attempts"));
    }

    #[test]
    fn test_accessors() {
        let pigeon = Pigeon::default();

        assert!(pigeon.mail().listeners().is_empty());
        assert_eq!(pigeon.store().root(), Path::new("/var/spool/mail"));
        assert!(pigeon.directory().build().is_ok());
        assert_eq!(pigeon.logging(), &LogConfig::default());
    }
}
