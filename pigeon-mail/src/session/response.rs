use core::fmt::{self, Display, Formatter, Write};

use pigeon_store::MessageRecord;

use crate::frame::FRAME_LIMIT;

/// Everything the server can say to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Welcome text and command help, sent once on connect
    Banner(String),
    LoginOk,
    LoginRejected,
    Ok,
    Goodbye,
    /// A pre-formatted LIST body
    Listing(String),
    Message(MessageRecord),
    ReceiverUnknown,
    MessageMissing,
    RemoveFailed,
    /// A store failure, described by its catalogue cause
    Failure(&'static str),
    WrongCommand,
    Malformed,
    ShuttingDown,
}

impl Response {
    /// The greeting for a server called `name`
    #[must_use]
    pub fn banner(name: &str) -> Self {
        Self::Banner(format!(
            "Welcome to {name}!\r\nPlease enter your commands...\r\n\
             SEND\n<receiver>\n<subject>\n<message>\n.\n\
             LIST\n.\n\
             READ\n<message number>\n.\n\
             DEL\n<message number>\n.\n\
             quit\n.\n"
        ))
    }

    /// Build a LIST response for `identity`.
    ///
    /// The header always carries the full count; entries are appended while
    /// the response stays within the frame limit.
    #[must_use]
    pub fn listing(identity: &str, entries: &[(usize, String)]) -> Self {
        let mut body = match entries.len() {
            1 => format!("There is 1 message for user {identity}.\n"),
            n => format!("There are {n} messages for user {identity}.\n"),
        };

        let mut entry = String::new();
        for (ordinal, subject) in entries {
            entry.clear();
            let _ = writeln!(entry, "{ordinal}: {subject}");

            if body.len() + entry.len() > FRAME_LIMIT {
                break;
            }
            body.push_str(&entry);
        }

        Self::Listing(body)
    }
}

impl Display for Response {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Banner(text) | Self::Listing(text) => fmt.write_str(text),
            Self::LoginOk => fmt.write_str("LOGINOK"),
            Self::LoginRejected => fmt.write_str("NOTOK"),
            Self::Ok => fmt.write_str("OK\n"),
            Self::Goodbye => fmt.write_str("OK - goodbye\n"),
            Self::Message(record) => write!(fmt, "OK\n{record}"),
            Self::ReceiverUnknown => fmt.write_str("ERR - receiver does not exist\n"),
            Self::MessageMissing => fmt.write_str("ERR\nThis message does not exist\n"),
            Self::RemoveFailed => fmt.write_str("ERR - could not remove message\n"),
            Self::Failure(cause) => writeln!(fmt, "ERR - {cause}"),
            Self::WrongCommand => fmt.write_str("ERR - wrong command\n"),
            Self::Malformed => fmt.write_str("ERR - malformed request\n"),
            Self::ShuttingDown => fmt.write_str("ERR - server shutting down\n"),
        }
    }
}
