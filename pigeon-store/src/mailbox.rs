use std::{fmt, path::Path, path::PathBuf};

/// Which half of a mailbox a message is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKind {
    /// Messages received by the mailbox owner.
    Inbox,
    /// Copies of messages the owner sent.
    Outbox,
}

impl BoxKind {
    pub const ALL: [Self; 2] = [Self::Inbox, Self::Outbox];

    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Inbox => "in",
            Self::Outbox => "out",
        }
    }

    /// `<mailbox>/<in|out>`
    #[must_use]
    pub fn path_in(self, mailbox: &Path) -> PathBuf {
        mailbox.join(self.dir_name())
    }
}

impl fmt::Display for BoxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
