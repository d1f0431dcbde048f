use core::fmt::{self, Display, Formatter};

use crate::error::ParseError;

/// A request from an authenticated client.
///
/// Keywords are case sensitive and occupy the first line of the frame; the
/// remaining lines are the arguments.
///
/// ```text
/// SEND\n<receiver>\n<subject>\n<body...>
/// LIST
/// READ\n<ordinal>
/// DEL\n<ordinal>
/// quit
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send {
        receiver: String,
        subject: String,
        /// Every line after the subject, joined with `\n`
        body: String,
    },
    List,
    Read {
        ordinal: usize,
    },
    Delete {
        ordinal: usize,
    },
    Quit,
    /// Anything with an unrecognised keyword
    Unknown(String),
}

impl Command {
    /// Whether `frame` is the quit request.
    #[must_use]
    pub fn is_quit(frame: &str) -> bool {
        frame.lines().next() == Some("quit")
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        match self {
            Self::Send { .. } => "SEND",
            Self::List => "LIST",
            Self::Read { .. } => "READ",
            Self::Delete { .. } => "DEL",
            Self::Quit => "quit",
            Self::Unknown(keyword) => keyword.as_str(),
        }
    }
}

impl TryFrom<&str> for Command {
    type Error = ParseError;

    fn try_from(frame: &str) -> Result<Self, Self::Error> {
        let mut lines = frame.split('\n');
        let keyword = lines.next().filter(|k| !k.is_empty()).ok_or(ParseError::Empty)?;

        match keyword {
            "SEND" => {
                let receiver = required(lines.next(), "receiver")?;
                let subject = required(lines.next(), "subject")?;
                let body = lines.collect::<Vec<_>>();
                if body.is_empty() {
                    return Err(ParseError::MissingField("message"));
                }

                Ok(Self::Send {
                    receiver: receiver.to_string(),
                    subject: subject.to_string(),
                    body: body.join("\n"),
                })
            }
            "LIST" => Ok(Self::List),
            "READ" => ordinal(lines.next()).map(|ordinal| Self::Read { ordinal }),
            "DEL" => ordinal(lines.next()).map(|ordinal| Self::Delete { ordinal }),
            "quit" => Ok(Self::Quit),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }
}

impl Display for Command {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send {
                receiver,
                subject,
                body,
            } => write!(fmt, "SEND\n{receiver}\n{subject}\n{body}"),
            Self::Read { ordinal } => write!(fmt, "READ\n{ordinal}"),
            Self::Delete { ordinal } => write!(fmt, "DEL\n{ordinal}"),
            Self::List | Self::Quit | Self::Unknown(_) => fmt.write_str(self.keyword()),
        }
    }
}

fn required<'a>(line: Option<&'a str>, field: &'static str) -> Result<&'a str, ParseError> {
    line.filter(|l| !l.is_empty())
        .ok_or(ParseError::MissingField(field))
}

fn ordinal(line: Option<&str>) -> Result<usize, ParseError> {
    let raw = required(line, "message number")?;
    raw.trim()
        .parse()
        .map_err(|_| ParseError::InvalidOrdinal(raw.to_string()))
}
