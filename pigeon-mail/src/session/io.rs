use std::time::Instant;

use pigeon_common::{internal, tracing};
use pigeon_store::{BoxKind, StoreError};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{Session, response::Response};
use crate::{command::Command, fsm::Event, state::State};

/// Cause reported when no mail store was configured
const NO_STORE: &str = "unknown error";

impl<Stream: AsyncRead + AsyncWrite + Unpin + Send + Sync> Session<Stream> {
    /// Act on one frame from the client.
    ///
    /// Returns the response to send, if any; quitting during login and
    /// submitting an identity are answered with silence.
    pub(super) async fn handle_frame(&mut self, frame: &str) -> Option<Response> {
        match self.state.clone() {
            State::AwaitIdentity if Command::is_quit(frame) => {
                self.advance(Event::Quit);
                None
            }
            State::AwaitIdentity => {
                self.advance(Event::Identity(first_line(frame).to_string()));
                None
            }
            State::AwaitSecret { .. } if Command::is_quit(frame) => {
                self.advance(Event::Quit);
                None
            }
            State::AwaitSecret { identity } => Some(self.login(&identity, first_line(frame)).await),
            State::Authenticated { identity } => Some(self.command(&identity, frame).await),
            State::Connect | State::Closed => None,
        }
    }

    #[tracing::instrument(level = "debug", skip(self, secret), fields(peer = %self.peer))]
    async fn login(&mut self, identity: &str, secret: &str) -> Response {
        let now = Instant::now();
        if self.attempts.is_locked(now) {
            let remaining = self
                .attempts
                .locked_until()
                .map_or(0, |until| until.saturating_duration_since(now).as_secs());
            internal!(
                level = INFO,
                "Refusing login for {identity}: locked out for another {remaining}s"
            );
            self.advance(Event::LockedOut);
            return Response::LoginRejected;
        }

        let accepted = match self.verifier.as_ref() {
            Some(verifier) => {
                verifier.authenticate(identity, secret).await && verifier.exists(identity).await
            }
            None => false,
        };

        if accepted {
            internal!(level = INFO, "{identity} logged in");
            self.advance(Event::LoginAccepted);
            Response::LoginOk
        } else {
            internal!(level = INFO, "Login failed for {identity}");
            self.advance(Event::LoginRejected { at: now });
            Response::LoginRejected
        }
    }

    async fn command(&mut self, identity: &str, frame: &str) -> Response {
        let command = match Command::try_from(frame) {
            Ok(command) => command,
            Err(err) => {
                internal!(level = DEBUG, "Malformed request: {err}");
                return Response::Malformed;
            }
        };

        let response = match command {
            Command::Send {
                receiver,
                subject,
                body,
            } => self.send_message(identity, &receiver, &subject, &body).await,
            Command::List => self.list(identity).await,
            Command::Read { ordinal } => self.read(identity, ordinal).await,
            Command::Delete { ordinal } => self.delete(identity, ordinal).await,
            Command::Quit => {
                self.advance(Event::Quit);
                return Response::Goodbye;
            }
            Command::Unknown(keyword) => {
                internal!(level = DEBUG, "Unknown command {keyword:?}");
                Response::WrongCommand
            }
        };

        self.advance(Event::Command);
        response
    }

    async fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        subject: &str,
        body: &str,
    ) -> Response {
        let receiver_known = match self.verifier.as_ref() {
            Some(verifier) => verifier.exists(receiver).await,
            None => false,
        };
        if !receiver_known {
            return Response::ReceiverUnknown;
        }

        let Some(store) = self.store.as_ref() else {
            return Response::Failure(NO_STORE);
        };

        let saved = async {
            store
                .ensure_and_save(receiver, sender, subject, body, BoxKind::Inbox)
                .await?;
            store
                .ensure_and_save(sender, sender, subject, body, BoxKind::Outbox)
                .await
        };

        match saved.await {
            Ok(()) => Response::Ok,
            Err(err) => failure("send", &err),
        }
    }

    async fn list(&self, identity: &str) -> Response {
        let Some(store) = self.store.as_ref() else {
            return Response::Failure(NO_STORE);
        };

        match store.list(identity).await {
            Ok(entries) => Response::listing(identity, &entries),
            Err(err) => failure("list", &err),
        }
    }

    async fn read(&self, identity: &str, ordinal: usize) -> Response {
        let Some(store) = self.store.as_ref() else {
            return Response::Failure(NO_STORE);
        };

        match store.read(identity, ordinal).await {
            Ok(record) => Response::Message(record),
            Err(StoreError::NotFound { .. }) => Response::MessageMissing,
            Err(err) => failure("read", &err),
        }
    }

    async fn delete(&self, identity: &str, ordinal: usize) -> Response {
        let Some(store) = self.store.as_ref() else {
            return Response::Failure(NO_STORE);
        };

        match store.delete(identity, ordinal).await {
            Ok(()) => Response::Ok,
            Err(StoreError::NotFound { .. }) => Response::RemoveFailed,
            Err(err) => failure("delete", &err),
        }
    }
}

fn failure(operation: &str, err: &StoreError) -> Response {
    internal!(level = WARN, "Unable to {operation}: {err}");
    Response::Failure(err.cause())
}

fn first_line(frame: &str) -> &str {
    frame.split('\n').next().unwrap_or_default()
}
