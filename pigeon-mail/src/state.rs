use core::fmt::{self, Display, Formatter};

/// Where a session is in its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum State {
    /// Connected; the banner has not been sent yet
    #[default]
    Connect,
    /// Waiting for the identity frame of a login
    AwaitIdentity,
    /// Waiting for the secret frame of a login
    AwaitSecret { identity: String },
    /// Logged in and accepting commands
    Authenticated { identity: String },
    /// Finished; nothing more is read or written
    Closed,
}

impl State {
    /// Whether the session is somewhere in the login exchange
    #[must_use]
    pub const fn is_authenticating(&self) -> bool {
        matches!(self, Self::AwaitIdentity | Self::AwaitSecret { .. })
    }

    /// The logged in identity, if any
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Authenticated { identity } => Some(identity),
            _ => None,
        }
    }
}

impl Display for State {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => fmt.write_str("Connect"),
            Self::AwaitIdentity => fmt.write_str("AwaitIdentity"),
            Self::AwaitSecret { .. } => fmt.write_str("AwaitSecret"),
            Self::Authenticated { identity } => write!(fmt, "Authenticated({identity})"),
            Self::Closed => fmt.write_str("Closed"),
        }
    }
}
