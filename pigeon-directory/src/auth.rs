//! Secret hashing
//!
//! Account secrets are never kept in plaintext. Configuration carries the
//! SHA-256 digest of each secret as a 64-character hex string, and an offered
//! secret is hashed before it is compared.
//!
//! ```bash
//! echo -n "your-secret" | sha256sum
//! ```

use hex::encode;
use sha2::{Digest, Sha256};

/// Length of a hex encoded SHA-256 digest
pub const DIGEST_LEN: usize = 64;

/// Hash `secret` into the form stored in configuration.
///
/// ```
/// # use pigeon_directory::auth::hash_secret;
/// assert_eq!(
///     hash_secret("secret"),
///     "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
/// );
/// ```
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    encode(hasher.finalize())
}

/// Whether `secret` hashes to `digest`. The digest may be in either case.
#[must_use]
pub fn verify_secret(secret: &str, digest: &str) -> bool {
    hash_secret(secret).eq_ignore_ascii_case(digest)
}

/// Whether `digest` looks like a hex encoded SHA-256 digest.
#[must_use]
pub fn is_digest(digest: &str) -> bool {
    digest.len() == DIGEST_LEN && digest.bytes().all(|b| b.is_ascii_hexdigit())
}
