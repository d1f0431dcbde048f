//! Session finite state machine.
//!
//! Transitions are pure: the session performs the I/O (reading frames,
//! consulting the directory, touching the store) and feeds the outcome in as
//! an [`Event`]. Failed logins are tracked in [`LoginAttempts`].

use std::time::{Duration, Instant};

use pigeon_common::traits::fsm::FiniteStateMachine;

use crate::{config::LockoutConfig, state::State};

/// Something that happened to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The banner was written
    Greeted,
    /// An identity frame arrived
    Identity(String),
    /// The directory accepted the credentials
    LoginAccepted,
    /// The directory rejected the credentials
    LoginRejected { at: Instant },
    /// A login was refused because the session is locked out
    LockedOut,
    /// An authenticated command was handled
    Command,
    /// The client asked to quit
    Quit,
    /// The client went away, or the session was told to stop
    Disconnected,
}

/// Failed login bookkeeping for one session
#[derive(Debug, Clone)]
pub struct LoginAttempts {
    max_attempts: u32,
    lockout: Duration,
    failures: u32,
    locked_until: Option<Instant>,
}

impl LoginAttempts {
    #[must_use]
    pub const fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts,
            lockout,
            failures: 0,
            locked_until: None,
        }
    }

    /// Whether login attempts are refused at `now`
    #[must_use]
    pub fn is_locked(&self, now: Instant) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    #[must_use]
    pub const fn locked_until(&self) -> Option<Instant> {
        self.locked_until
    }

    fn record_failure(&mut self, at: Instant) {
        self.failures += 1;

        if self.failures >= self.max_attempts {
            self.locked_until = Some(at + self.lockout);
            self.failures = 0;
        }
    }

    fn reset(&mut self) {
        self.failures = 0;
        self.locked_until = None;
    }
}

impl From<&LockoutConfig> for LoginAttempts {
    fn from(config: &LockoutConfig) -> Self {
        Self::new(config.max_attempts, config.lockout())
    }
}

impl Default for LoginAttempts {
    fn default() -> Self {
        Self::from(&LockoutConfig::default())
    }
}

impl FiniteStateMachine for State {
    type Input = Event;
    type Context = LoginAttempts;

    fn transition(self, input: Self::Input, attempts: &mut Self::Context) -> Self {
        match (self, input) {
            (_, Event::Quit | Event::Disconnected) => Self::Closed,
            (Self::Connect, Event::Greeted) => Self::AwaitIdentity,
            (Self::AwaitIdentity, Event::Identity(identity)) => Self::AwaitSecret { identity },
            (Self::AwaitSecret { identity }, Event::LoginAccepted) => {
                attempts.reset();
                Self::Authenticated { identity }
            }
            (Self::AwaitSecret { .. }, Event::LoginRejected { at }) => {
                attempts.record_failure(at);
                Self::AwaitIdentity
            }
            (Self::AwaitSecret { .. }, Event::LockedOut) => Self::AwaitIdentity,
            (state, _) => state,
        }
    }
}
