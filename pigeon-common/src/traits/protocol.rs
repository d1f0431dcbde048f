use std::{fmt::Debug, net::SocketAddr};

use serde::Deserialize;
use tokio::net::TcpStream;

use crate::{
    Signal,
    error::{ProtocolError, SessionError},
};

pub trait SessionHandler {
    /// Drive the session until the peer quits, disconnects, or `signal`
    /// delivers [`Signal::Shutdown`].
    fn run(
        self,
        signal: tokio::sync::broadcast::Receiver<Signal>,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

pub trait Protocol: Default + Send + Sync {
    type Session: SessionHandler + Send + 'static;
    type Args: Default + Clone + Debug + Send + Sync + for<'a> Deserialize<'a>;

    fn handle(&self, stream: TcpStream, peer: SocketAddr, args: Self::Args) -> Self::Session;

    ///
    /// Validate the arguments being provided to the protocol
    ///
    /// # Errors
    /// This really depends on what needs to be done in order to validate the protocols arguments.
    ///
    /// For example, runtime resources injected after deserialisation (such as
    /// the mail store) must be present before any connection is accepted.
    ///
    fn validate(&mut self, args: &mut Self::Args) -> Result<(), ProtocolError>;

    /// Written to a connection that arrives while the listener is at its
    /// session cap, just before the connection is closed.
    fn busy() -> &'static str;

    fn ty() -> &'static str;
}
