use std::{net::SocketAddr, sync::Arc, time::Duration};

use serde::Deserialize;
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    sync::{
        Semaphore,
        broadcast::{self, error::RecvError},
    },
    task::JoinSet,
};

use crate::{
    Signal,
    error::{ListenerError, ProtocolError},
    internal,
    traits::protocol::{Protocol, SessionHandler},
};

/// Accepts connections on one socket and runs a session task per connection.
#[derive(Debug, Deserialize)]
pub struct Listener<Proto: Protocol> {
    #[serde(skip)]
    handler: Proto,
    socket: SocketAddr,
    /// Upper bound on concurrently running sessions. Connections beyond it
    /// receive [`Protocol::busy`] and are closed.
    #[serde(default)]
    max_sessions: Option<usize>,
    /// How long to wait for running sessions after a shutdown before they
    /// are aborted. Without it, shutdown waits for every session.
    #[serde(default)]
    drain_timeout_secs: Option<u64>,
    #[serde(default, alias = "session")]
    args: Proto::Args,
}

impl<Proto: Protocol> Listener<Proto> {
    #[must_use]
    pub fn new(socket: SocketAddr, args: Proto::Args) -> Self {
        Self {
            handler: Proto::default(),
            socket,
            max_sessions: None,
            drain_timeout_secs: None,
            args,
        }
    }

    #[must_use]
    pub const fn with_max_sessions(mut self, max_sessions: Option<usize>) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    #[must_use]
    pub const fn with_drain_timeout(mut self, secs: Option<u64>) -> Self {
        self.drain_timeout_secs = secs;
        self
    }

    #[must_use]
    pub const fn socket(&self) -> SocketAddr {
        self.socket
    }

    /// Map over the args of this listener, allowing modification before
    /// initialisation
    pub fn map_args<F>(&mut self, f: F)
    where
        F: Fn(Proto::Args) -> Proto::Args,
    {
        self.args = f(std::mem::take(&mut self.args));
    }

    ///
    /// # Errors
    /// If the protocol rejects its arguments, or the session cap is zero
    ///
    #[tracing::instrument(level = "trace", skip(self), fields(socket = %self.socket))]
    pub fn init(&mut self) -> Result<(), ProtocolError> {
        if self.max_sessions == Some(0) {
            return Err(ProtocolError::InvalidConfiguration {
                field: "max_sessions".to_string(),
                reason: "must be at least 1 when set".to_string(),
            });
        }

        self.handler.validate(&mut self.args)
    }

    ///
    /// # Errors
    /// If the socket cannot be bound
    ///
    pub async fn bind(&self) -> Result<TcpListener, ListenerError> {
        TcpListener::bind(self.socket)
            .await
            .map_err(|source| ListenerError::BindFailed {
                address: self.socket.to_string(),
                source,
            })
    }

    ///
    /// # Errors
    /// If the socket cannot be bound
    ///
    pub async fn serve(&self, shutdown: broadcast::Receiver<Signal>) -> anyhow::Result<()> {
        let listener = self.bind().await?;
        self.serve_on(listener, shutdown).await
    }

    /// Accept connections on an already bound `listener` until `shutdown`
    /// delivers [`Signal::Shutdown`] (or its sender goes away), then drain.
    ///
    /// # Errors
    /// If the local address of `listener` cannot be determined
    ///
    #[tracing::instrument(level = "trace", skip_all, err)]
    pub async fn serve_on(
        &self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<Signal>,
    ) -> anyhow::Result<()> {
        let address = listener.local_addr()?;
        internal!(level = INFO, "{} listening on {address}", Proto::ty());

        let permits = self.max_sessions.map(|max| Arc::new(Semaphore::new(max)));
        let signals = shutdown.resubscribe();
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown) | Err(RecvError::Closed) => {
                            internal!(
                                level = INFO,
                                "{} Listener {address} received Shutdown signal, finishing {} sessions ...",
                                Proto::ty(),
                                sessions.len()
                            );
                            break;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!("Shutdown receiver lagged by {skipped} signals");
                        }
                    }
                }

                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(err) = finished {
                        internal!(level = WARN, "Session task failed: {err}");
                    }
                }

                connection = listener.accept() => {
                    let (stream, peer) = match connection {
                        Ok(connection) => connection,
                        Err(err) => {
                            internal!(level = WARN, "{}", ListenerError::AcceptFailed(err));
                            continue;
                        }
                    };

                    tracing::debug!("Connection received on {address} from {peer}");

                    let permit = match permits.as_ref().map(|p| Arc::clone(p).try_acquire_owned()) {
                        None => None,
                        Some(Ok(permit)) => Some(permit),
                        Some(Err(_)) => {
                            internal!(level = WARN, "Session limit reached, refusing {peer}");
                            sessions.spawn(refuse(stream, Proto::busy()));
                            continue;
                        }
                    };

                    let session = self.handler.handle(stream, peer, self.args.clone());
                    let signal = signals.resubscribe();

                    sessions.spawn(async move {
                        let _permit = permit;
                        match session.run(signal).await {
                            Ok(()) => {}
                            Err(err) if err.is_shutdown() => {
                                internal!(level = DEBUG, "Session with {peer} closed for shutdown");
                            }
                            Err(err) if err.is_client_error() => {
                                internal!(level = INFO, "Session with {peer} ended: {err}");
                            }
                            Err(err) => {
                                internal!(level = WARN, "Session with {peer} ended with an error: {err}");
                            }
                        }
                    });
                }
            }
        }

        drop(listener);
        self.drain(&mut sessions).await;

        internal!(level = INFO, "{} Listener {address} finished", Proto::ty());

        Ok(())
    }

    async fn drain(&self, sessions: &mut JoinSet<()>) {
        let Some(secs) = self.drain_timeout_secs else {
            Self::join_all(sessions).await;
            return;
        };

        if tokio::time::timeout(Duration::from_secs(secs), Self::join_all(sessions))
            .await
            .is_err()
        {
            internal!(
                level = WARN,
                "{} sessions still running after {secs}s, aborting them",
                sessions.len()
            );
            sessions.abort_all();
            Self::join_all(sessions).await;
        }
    }

    async fn join_all(sessions: &mut JoinSet<()>) {
        while let Some(finished) = sessions.join_next().await {
            match finished {
                Err(err) if !err.is_cancelled() => {
                    internal!(level = WARN, "Session task failed: {err}");
                }
                _ => {}
            }
        }
    }
}

async fn refuse(mut stream: TcpStream, busy: &'static str) {
    if let Err(err) = stream.write_all(busy.as_bytes()).await {
        tracing::debug!("Unable to notify refused connection: {err}");
    }
    let _ = stream.shutdown().await;
}

impl<Proto: Protocol> From<SocketAddr> for Listener<Proto> {
    fn from(socket: SocketAddr) -> Self {
        Self::new(socket, Proto::Args::default())
    }
}
