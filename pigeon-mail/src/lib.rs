pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod fsm;
pub mod session;
pub mod state;

use std::net::SocketAddr;

use pigeon_common::{
    Signal,
    error::{ProtocolError, SessionError},
    traits::protocol::{Protocol, SessionHandler},
};
use serde::Deserialize;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

pub use crate::{
    config::{LockoutConfig, MailArgs},
    session::{Response, Session},
    state::State,
};

/// The mail protocol: login, then SEND / LIST / READ / DEL / quit
#[derive(Debug, Default, Deserialize)]
pub struct Mail;

impl Protocol for Mail {
    type Session = Session<TcpStream>;
    type Args = MailArgs;

    fn ty() -> &'static str {
        "Mail"
    }

    fn busy() -> &'static str {
        "ERR - too many connections\n"
    }

    #[tracing::instrument(level = "trace", skip(self, stream, args))]
    fn handle(&self, stream: TcpStream, peer: SocketAddr, args: Self::Args) -> Self::Session {
        Session::create(stream, peer, args)
    }

    #[tracing::instrument(skip(self, args))]
    fn validate(&mut self, args: &mut Self::Args) -> Result<(), ProtocolError> {
        if args.store.is_none() {
            return Err(ProtocolError::MissingField("store"));
        }

        if args.verifier.is_none() {
            return Err(ProtocolError::MissingField("verifier"));
        }

        args.lockout.validate()
    }
}

impl<Stream> SessionHandler for Session<Stream>
where
    Stream: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static,
{
    async fn run(self, signal: tokio::sync::broadcast::Receiver<Signal>) -> Result<(), SessionError> {
        Self::run(self, signal).await
    }
}
