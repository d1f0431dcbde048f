use std::fmt;

const SENDER_PREFIX: &str = "from: ";

/// A stored message: who sent it, and what they wrote.
///
/// On disk a record is `from: <sender>\n<body>\n`; the subject is the file
/// name and is not part of the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub sender: String,
    pub body: String,
}

impl MessageRecord {
    #[must_use]
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }

    /// Parse the on-disk representation of a record.
    ///
    /// Returns `None` when the sender line is missing.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(SENDER_PREFIX)?;
        let (sender, body) = rest.split_once('\n')?;
        let body = body.strip_suffix('\n').unwrap_or(body);

        Some(Self::new(sender, body))
    }
}

impl fmt::Display for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SENDER_PREFIX}{}\n{}\n", self.sender, self.body)
    }
}
