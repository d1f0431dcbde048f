use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::store::Mailstore;

/// Where the mail root lives
///
/// ```ron
/// Pigeon (
///     store: (
///         root: "/var/spool/mail",
///     ),
/// )
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/spool/mail"),
        }
    }
}

impl<'de> Deserialize<'de> for StoreConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct StoreConfigHelper {
            root: PathBuf,
        }

        let helper = StoreConfigHelper::deserialize(deserializer)?;
        Self::new(helper.root).map_err(serde::de::Error::custom)
    }
}

impl StoreConfig {
    ///
    /// # Errors
    /// If `root` is not an acceptable mail root (see [`StoreConfig::validate_path`])
    ///
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        Self::validate_path(&root)?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate a mail root
    ///
    /// - Rejects paths containing `..`
    /// - Rejects relative paths
    /// - Rejects paths inside system directories
    ///
    /// # Errors
    /// Returns an error if the path is invalid or potentially dangerous
    pub fn validate_path(path: &Path) -> anyhow::Result<()> {
        if path.components().any(|c| c == Component::ParentDir) {
            anyhow::bail!(
                "Mail root cannot contain '..' components: {}",
                path.display()
            );
        }

        if !path.is_absolute() {
            anyhow::bail!("Mail root must be absolute: {}", path.display());
        }

        let sensitive_prefixes = [
            "/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev",
        ];

        if let Some(prefix) = sensitive_prefixes.iter().find(|p| path.starts_with(p)) {
            anyhow::bail!(
                "Mail root cannot be in system directory {prefix}: {}",
                path.display()
            );
        }

        Ok(())
    }

    #[must_use]
    pub fn build(&self) -> Mailstore {
        Mailstore::new(self.root.clone())
    }
}
