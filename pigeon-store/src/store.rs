use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use pigeon_common::internal;
use tokio::fs;

use crate::{
    error::{Result, StoreError},
    mailbox::BoxKind,
    record::MessageRecord,
    safe_name::is_safe_name,
};

static WRITE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// File-system backed mailbox store
///
/// Every identity owns `<root>/<identity>/in` and `<root>/<identity>/out`,
/// created together by the first message filed for that identity. A message
/// lives in `<box>/<subject>`, so a second message with the same subject
/// replaces the first.
///
/// Messages are addressed by ordinal: their 1-based position in the
/// directory listing at the time of the call. Ordinals are not stable, and
/// removing a message shifts every later one down by one.
///
/// Writes go to a hidden temporary file first and are renamed into place, so
/// readers never observe a partially written message. Hidden entries are never
/// counted or listed.
#[derive(Debug, Clone)]
pub struct Mailstore {
    root: PathBuf,
}

impl Mailstore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the mail root if it is missing.
    ///
    /// # Errors
    /// - If the root cannot be created
    /// - If the root exists but is not a directory
    pub async fn init(&self) -> Result<()> {
        internal!("Initialising Mailstore at {} ...", self.root.display());

        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(io::Error::new(
                ErrorKind::NotADirectory,
                format!(
                    "Expected {} to be a Directory, but it is not",
                    self.root.display()
                ),
            )
            .into()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                internal!("{} does not exist, creating...", self.root.display());
                fs::create_dir_all(&self.root).await.map_err(Into::into)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// File a message under `identity`, creating the mailbox on first use.
    ///
    /// # Errors
    /// - [`StoreError::InvalidName`] if `identity` or `subject` is not a safe file name
    /// - [`StoreError::MailboxCreation`] if the mailbox root was created but a box was not
    /// - [`StoreError::Io`] for any other file-system failure
    #[tracing::instrument(level = "debug", skip(self, body))]
    pub async fn ensure_and_save(
        &self,
        identity: &str,
        sender: &str,
        subject: &str,
        body: &str,
        kind: BoxKind,
    ) -> Result<()> {
        let mailbox = self.mailbox(identity)?;
        ensure_safe(subject)?;

        match fs::create_dir(&mailbox).await {
            Ok(()) => {
                internal!("Created mailbox {}", mailbox.display());
                for kind in BoxKind::ALL {
                    let path = kind.path_in(&mailbox);
                    fs::create_dir(&path)
                        .await
                        .map_err(|source| StoreError::MailboxCreation { path, source })?;
                }
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err.into()),
        }

        let dir = kind.path_in(&mailbox);
        let target = dir.join(subject);
        // Independent of the subject, which may use the whole of NAME_MAX
        let staging = dir.join(format!(
            ".tmp_{}_{}",
            std::process::id(),
            WRITE_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));

        let record = MessageRecord::new(sender, body);
        fs::write(&staging, record.to_string()).await?;
        if let Err(err) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(err.into());
        }

        internal!("Saved {} to {}", subject, dir.display());

        Ok(())
    }

    /// Number of messages in the inbox of `identity`; 0 if there is no inbox.
    ///
    /// # Errors
    /// If the identity is not a safe name or the inbox cannot be listed
    pub async fn count(&self, identity: &str) -> Result<usize> {
        Ok(self.entries(identity).await?.len())
    }

    /// The inbox of `identity` as `(ordinal, subject)` pairs.
    ///
    /// # Errors
    /// If the identity is not a safe name or the inbox cannot be listed
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list(&self, identity: &str) -> Result<Vec<(usize, String)>> {
        Ok(self
            .entries(identity)
            .await?
            .into_iter()
            .enumerate()
            .map(|(idx, subject)| (idx + 1, subject))
            .collect())
    }

    /// Read the inbox message at `ordinal`.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if `ordinal` is outside `1..=count`
    /// - [`StoreError::Io`] if the message cannot be read or is not a record
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn read(&self, identity: &str, ordinal: usize) -> Result<MessageRecord> {
        let path = self.locate(identity, ordinal).await?;
        let raw = fs::read_to_string(&path).await?;

        MessageRecord::parse(&raw).ok_or_else(|| {
            io::Error::new(
                ErrorKind::InvalidData,
                format!("{} is not a message record", path.display()),
            )
            .into()
        })
    }

    /// Remove the inbox message at `ordinal`.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if `ordinal` is outside `1..=count`
    /// - [`StoreError::Io`] if the file cannot be removed
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn delete(&self, identity: &str, ordinal: usize) -> Result<()> {
        let path = self.locate(identity, ordinal).await?;
        fs::remove_file(&path).await?;

        internal!("Removed {}", path.display());

        Ok(())
    }

    fn mailbox(&self, identity: &str) -> Result<PathBuf> {
        ensure_safe(identity)?;
        Ok(self.root.join(identity))
    }

    async fn locate(&self, identity: &str, ordinal: usize) -> Result<PathBuf> {
        let inbox = BoxKind::Inbox.path_in(&self.mailbox(identity)?);
        let entries = list_dir(&inbox).await?;
        ordinal
            .checked_sub(1)
            .and_then(|idx| entries.into_iter().nth(idx))
            .map(|subject| inbox.join(subject))
            .ok_or(StoreError::NotFound { ordinal })
    }

    async fn entries(&self, identity: &str) -> Result<Vec<String>> {
        let inbox = BoxKind::Inbox.path_in(&self.mailbox(identity)?);
        Ok(list_dir(&inbox).await?)
    }
}

fn ensure_safe(name: &str) -> Result<()> {
    if is_safe_name(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Visible entries of `dir` in directory-listing order; empty if `dir` is
/// missing.
async fn list_dir(dir: &Path) -> io::Result<Vec<String>> {
    let mut reader = match fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut names = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        match entry.file_name().into_string() {
            Ok(name) if is_safe_name(&name) => names.push(name),
            Ok(_) => {}
            Err(name) => {
                tracing::debug!("Skipping non UTF-8 entry {name:?} in {}", dir.display());
            }
        }
    }

    Ok(names)
}
