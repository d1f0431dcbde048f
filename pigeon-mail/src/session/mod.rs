use std::{net::SocketAddr, sync::Arc};

use pigeon_common::{
    Signal, config::SessionTimeouts, error::SessionError, incoming, internal, outgoing, tracing,
    traits::fsm::FiniteStateMachine,
};
use pigeon_directory::CredentialVerifier;
use pigeon_store::Mailstore;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time::Instant,
};

use crate::{
    config::MailArgs,
    connection::Connection,
    error::FrameError,
    fsm::{Event, LoginAttempts},
    state::State,
};

mod io;
mod response;

pub use response::Response;

/// One client connection, from banner to close
pub struct Session<Stream: AsyncRead + AsyncWrite + Unpin + Send + Sync> {
    peer: SocketAddr,
    connection: Connection<Stream>,
    state: State,
    attempts: LoginAttempts,
    banner: String,
    store: Option<Arc<Mailstore>>,
    verifier: Option<CredentialVerifier>,
    timeouts: SessionTimeouts,
    /// Start time for tracking connection lifetime
    start_time: Instant,
}

impl<Stream: AsyncRead + AsyncWrite + Unpin + Send + Sync> Session<Stream> {
    #[tracing::instrument(level = "trace", skip_all, fields(%peer))]
    pub fn create(stream: Stream, peer: SocketAddr, args: MailArgs) -> Self {
        tracing::debug!(lockout = ?args.lockout, timeouts = ?args.timeouts, "Creating session");

        Self {
            peer,
            connection: Connection::new(stream),
            state: State::default(),
            attempts: LoginAttempts::from(&args.lockout),
            banner: args.banner().to_string(),
            store: args.store,
            verifier: args.verifier,
            timeouts: args.timeouts,
            start_time: Instant::now(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Drive the session until the client quits or disconnects, a timeout
    /// expires, or `signal` asks for shutdown.
    ///
    /// The connection is shut down on every path out of here.
    ///
    /// # Errors
    /// - [`SessionError::Shutdown`] when the server is stopping
    /// - [`SessionError::Timeout`] when the client idles or overstays
    /// - [`SessionError::Connection`] when the transport fails
    #[tracing::instrument(level = "debug", skip_all, fields(peer = %self.peer))]
    pub async fn run(
        mut self,
        mut signal: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), SessionError> {
        internal!("Connected");

        let result = self.run_inner(&mut signal).await;
        self.advance(Event::Disconnected);
        self.connection.shutdown().await;

        internal!("Connection closed");
        result
    }

    async fn run_inner(
        &mut self,
        signal: &mut tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), SessionError> {
        let banner = Response::banner(&self.banner);
        self.send(&banner).await?;
        self.advance(Event::Greeted);

        loop {
            if self.state == State::Closed {
                return Ok(());
            }

            let lifetime = self.timeouts.connection_timeout();
            let connection_duration = self.start_time.elapsed();
            if connection_duration >= lifetime {
                return Err(self.lifetime_exceeded());
            }

            // An idle client is cut off at the end of its lifetime too
            let command_timeout = self.timeouts.command_timeout();
            let wait = command_timeout.min(lifetime - connection_duration);
            let received = tokio::select! {
                _ = signal.recv() => None,
                received = tokio::time::timeout(wait, self.connection.receive()) => Some(received),
            };

            let Some(received) = received else {
                internal!(level = DEBUG, "Shutdown requested, closing session");
                self.send(&Response::ShuttingDown).await?;
                return Err(SessionError::Shutdown);
            };

            let frame = match received {
                Err(_) if wait < command_timeout => return Err(self.lifetime_exceeded()),
                Err(_) => {
                    tracing::warn!(
                        peer = %self.peer,
                        state = %self.state,
                        authenticating = self.state.is_authenticating(),
                        timeout_secs = self.timeouts.command_secs,
                        "Client connection timed out"
                    );
                    return Err(SessionError::Timeout(self.timeouts.command_secs));
                }
                Ok(Ok(Some(frame))) => frame,
                Ok(Ok(None)) => return Ok(()),
                Ok(Err(FrameError::TooLarge { limit })) => {
                    incoming!("<discarded frame over {limit} bytes>");
                    self.send(&Response::Malformed).await?;
                    continue;
                }
                Ok(Err(FrameError::Io(err))) => {
                    internal!(level = ERROR, "{err}");
                    return Err(SessionError::Connection(err));
                }
            };

            if matches!(self.state, State::AwaitSecret { .. }) {
                incoming!("<secret>");
            } else {
                incoming!("{frame}");
            }

            if let Some(response) = self.handle_frame(&frame).await {
                self.send(&response).await?;
            }
        }
    }

    fn lifetime_exceeded(&self) -> SessionError {
        tracing::warn!(
            peer = %self.peer,
            duration_secs = self.start_time.elapsed().as_secs(),
            max_secs = self.timeouts.connection_secs,
            "Connection exceeded maximum lifetime, closing"
        );
        SessionError::Timeout(self.timeouts.connection_secs)
    }

    async fn send(&mut self, response: &Response) -> Result<(), SessionError> {
        outgoing!("{response}");

        self.connection.send(&response.to_string()).await.map_err(|err| {
            internal!(level = ERROR, "{err}");
            SessionError::Connection(err)
        })
    }

    fn advance(&mut self, event: Event) {
        let state = std::mem::take(&mut self.state);
        self.state = state.transition(event, &mut self.attempts);
        tracing::trace!("Transitioned to {}", self.state);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use pigeon_common::{Signal, config::SessionTimeouts, error::SessionError};
    use pigeon_directory::{CredentialVerifier, TestDirectory};
    use pigeon_store::Mailstore;
    use pretty_assertions::assert_eq;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt, DuplexStream},
        sync::broadcast,
        task::JoinHandle,
    };

    use super::{Response, Session};
    use crate::config::{LockoutConfig, MailArgs};

    struct Harness {
        client: DuplexStream,
        shutdown: broadcast::Sender<Signal>,
        task: JoinHandle<Result<(), SessionError>>,
        directory: Arc<TestDirectory>,
        store: Arc<Mailstore>,
        root: Arc<tempfile::TempDir>,
    }

    impl Harness {
        async fn start() -> Self {
            Self::start_with(MailArgs::builder()).await
        }

        async fn start_with(args: MailArgs) -> Self {
            let root = Arc::new(tempfile::tempdir().unwrap());
            let store = Arc::new(Mailstore::new(root.path()));
            let directory = Arc::new(
                TestDirectory::new()
                    .with_account("alice", "wonderland")
                    .with_account("bob", "builder"),
            );

            Self::connect(args, root, store, directory).await
        }

        /// A second client against the same store and directory
        async fn reconnect(&self) -> Self {
            Self::connect(
                MailArgs::builder(),
                Arc::clone(&self.root),
                Arc::clone(&self.store),
                Arc::clone(&self.directory),
            )
            .await
        }

        async fn connect(
            args: MailArgs,
            root: Arc<tempfile::TempDir>,
            store: Arc<Mailstore>,
            directory: Arc<TestDirectory>,
        ) -> Self {
            let args = args
                .with_banner("test")
                .with_store(Arc::clone(&store))
                .with_verifier(CredentialVerifier::new(directory.clone()));

            let (client, server) = tokio::io::duplex(64 * 1024);
            let (shutdown, signal) = broadcast::channel(1);
            let session = Session::create(server, "127.0.0.1:6543".parse().unwrap(), args);
            let task = tokio::spawn(session.run(signal));

            let mut harness = Self {
                client,
                shutdown,
                task,
                directory,
                store,
                root,
            };
            harness.expect(&Response::banner("test").to_string()).await;
            harness
        }

        async fn write(&mut self, frame: &str) {
            self.client.write_all(frame.as_bytes()).await.unwrap();
        }

        async fn expect(&mut self, expected: &str) {
            let mut received = vec![0; expected.len()];
            tokio::time::timeout(Duration::from_secs(5), self.client.read_exact(&mut received))
                .await
                .expect("timed out waiting for a response")
                .unwrap();
            assert_eq!(String::from_utf8_lossy(&received), expected);
        }

        async fn exchange(&mut self, frame: &str, expected: &str) {
            self.write(frame).await;
            self.expect(expected).await;
        }

        async fn login(&mut self, identity: &str, secret: &str) {
            self.write(&format!("{identity}\n.\n")).await;
            self.exchange(&format!("{secret}\n.\n"), "LOGINOK").await;
        }

        async fn finish(mut self) -> Result<(), SessionError> {
            let mut rest = Vec::new();
            self.client.read_to_end(&mut rest).await.unwrap();
            assert!(rest.is_empty(), "unexpected output {rest:?}");
            self.task.await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let mut harness = Harness::start().await;

        harness.login("alice", "wonderland").await;
        harness.exchange("SEND\nbob\nhello\nhi there\n.\n", "OK\n").await;
        harness.exchange("quit\n.\n", "OK - goodbye\n").await;

        let bob = harness.reconnect().await;
        assert!(harness.finish().await.is_ok());

        let mut harness = bob;
        harness.login("bob", "builder").await;
        harness
            .exchange("LIST\n.\n", "There is 1 message for user bob.\n1: hello\n")
            .await;
        harness
            .exchange("READ\n1\n.\n", "OK\nfrom: alice\nhi there\n")
            .await;
        harness.exchange("DEL\n1\n.\n", "OK\n").await;
        harness
            .exchange("LIST\n.\n", "There are 0 messages for user bob.\n")
            .await;
        harness.exchange("quit\n.", "OK - goodbye\n").await;
        assert!(harness.finish().await.is_ok());
    }

    #[tokio::test]
    async fn test_send_keeps_outbox_copy() {
        let mut harness = Harness::start().await;

        harness.login("alice", "wonderland").await;
        harness.exchange("SEND\nbob\nhello\nhi there\n.\n", "OK\n").await;

        let outbox = harness.store.root().join("alice").join("out").join("hello");
        assert_eq!(
            std::fs::read_to_string(outbox).unwrap(),
            "from: alice\nhi there\n"
        );
    }

    #[tokio::test]
    async fn test_unknown_receiver_writes_nothing() {
        let mut harness = Harness::start().await;

        harness.login("alice", "wonderland").await;
        harness
            .exchange("SEND\ncarol\nhello\nhi\n.\n", "ERR - receiver does not exist\n")
            .await;

        assert!(!harness.store.root().join("carol").exists());
        assert!(!harness.store.root().join("alice").exists());
    }

    #[tokio::test]
    async fn test_malformed_requests_keep_session() {
        let mut harness = Harness::start().await;
        harness.login("alice", "wonderland").await;

        harness
            .exchange("SEND\nbob\n.\n", "ERR - malformed request\n")
            .await;
        harness
            .exchange("READ\nfirst\n.\n", "ERR - malformed request\n")
            .await;
        harness.exchange("DEL\n.\n", "ERR - malformed request\n").await;

        let oversized = format!("SEND\nbob\nbig\n{}\n.\n", "x".repeat(2048));
        harness
            .exchange(&oversized, "ERR - malformed request\n")
            .await;

        harness
            .exchange("LIST\n.\n", "There are 0 messages for user alice.\n")
            .await;
    }

    #[tokio::test]
    async fn test_wrong_command() {
        let mut harness = Harness::start().await;
        harness.login("alice", "wonderland").await;

        harness.exchange("HELO\n.\n", "ERR - wrong command\n").await;
        harness.exchange("list\n.\n", "ERR - wrong command\n").await;
        harness
            .exchange("LIST\n.\n", "There are 0 messages for user alice.\n")
            .await;
    }

    #[tokio::test]
    async fn test_missing_messages() {
        let mut harness = Harness::start().await;
        harness.login("bob", "builder").await;

        harness
            .exchange("READ\n1\n.\n", "ERR\nThis message does not exist\n")
            .await;
        harness
            .exchange("READ\n0\n.\n", "ERR\nThis message does not exist\n")
            .await;
        harness
            .exchange("DEL\n3\n.\n", "ERR - could not remove message\n")
            .await;
    }

    #[tokio::test]
    async fn test_list_is_truncated() {
        let mut harness = Harness::start().await;
        harness.login("alice", "wonderland").await;

        for n in 0..100 {
            harness
                .exchange(&format!("SEND\nalice\nsubject number {n:03}\nbody\n.\n"), "OK\n")
                .await;
        }

        harness.write("LIST\n.\n").await;
        let mut listing = vec![0; 2048];
        let read = harness.client.read(&mut listing).await.unwrap();
        let listing = String::from_utf8_lossy(&listing[..read]);

        assert!(listing.starts_with("There are 100 messages for user alice.\n"));
        assert!(listing.len() <= crate::frame::FRAME_LIMIT);
        assert!(listing.lines().count() < 101);
    }

    #[tokio::test]
    async fn test_failed_login_returns_to_identity() {
        let mut harness = Harness::start().await;

        harness.write("alice\n.\n").await;
        harness.exchange("nope\n.\n", "NOTOK").await;
        harness.login("alice", "wonderland").await;
    }

    #[tokio::test]
    async fn test_unknown_identity_rejected() {
        let mut harness = Harness::start().await;

        harness.write("carol\n.\n").await;
        harness.exchange("wonderland\n.\n", "NOTOK").await;
    }

    #[tokio::test]
    async fn test_directory_unavailable_rejects() {
        let mut harness = Harness::start().await;
        harness.directory.set_unavailable(true);

        harness.write("alice\n.\n").await;
        harness.exchange("wonderland\n.\n", "NOTOK").await;
    }

    #[tokio::test]
    async fn test_lockout() {
        let mut harness =
            Harness::start_with(MailArgs::builder().with_lockout(LockoutConfig::new(3, 1))).await;

        for _ in 0..3 {
            harness.write("alice\n.\n").await;
            harness.exchange("wrong\n.\n", "NOTOK").await;
        }
        assert_eq!(harness.directory.authenticate_calls(), 3);

        // Correct credentials are refused without asking the directory
        harness.write("alice\n.\n").await;
        harness.exchange("wonderland\n.\n", "NOTOK").await;
        assert_eq!(harness.directory.authenticate_calls(), 3);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        harness.login("alice", "wonderland").await;
        assert_eq!(harness.directory.authenticate_calls(), 4);
    }

    #[tokio::test]
    async fn test_quit_during_login() {
        let mut harness = Harness::start().await;

        harness.write("quit\n.\n").await;
        assert!(harness.finish().await.is_ok());

        let mut harness = Harness::start().await;
        harness.write("alice\n.\nquit\n.\n").await;
        assert!(harness.finish().await.is_ok());
    }

    #[tokio::test]
    async fn test_client_disconnect() {
        let mut harness = Harness::start().await;
        harness.login("alice", "wonderland").await;

        harness.client.shutdown().await.unwrap();
        assert!(harness.finish().await.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let mut harness = Harness::start().await;
        harness.login("alice", "wonderland").await;

        harness.shutdown.send(Signal::Shutdown).unwrap();
        harness.expect("ERR - server shutting down\n").await;

        let result = harness.finish().await;
        assert!(result.is_err_and(|err| err.is_shutdown()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout() {
        let timeouts = SessionTimeouts {
            command_secs: 5,
            connection_secs: 60,
        };
        let mut harness = Harness::start_with(MailArgs::builder().with_timeouts(timeouts)).await;

        harness.write("alice\n.\n").await;

        let result = harness.finish().await;
        assert!(matches!(result, Err(SessionError::Timeout(5))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_client_cut_off_at_lifetime() {
        let timeouts = SessionTimeouts {
            command_secs: 300,
            connection_secs: 10,
        };
        let mut harness = Harness::start_with(MailArgs::builder().with_timeouts(timeouts)).await;
        let started = tokio::time::Instant::now();

        harness.write("alice\n.\n").await;

        let result = harness.finish().await;
        assert!(matches!(result, Err(SessionError::Timeout(10))));
        assert!(started.elapsed() < Duration::from_secs(300));
    }
}
