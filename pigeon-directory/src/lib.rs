//! Credential verification for Pigeon
//!
//! A [`Directory`] is the external account service: it can bind an identity
//! with a secret, and count the accounts matching an identity. The
//! [`CredentialVerifier`] is what sessions talk to; it turns every directory
//! failure into a plain rejection.

pub mod auth;
pub mod backends;
pub mod config;
pub mod directory;
pub mod error;
pub mod verifier;

pub use backends::{StaticDirectory, TestDirectory};
pub use config::{Account, DirectoryConfig};
pub use directory::Directory;
pub use error::{DirectoryError, Result};
pub use verifier::CredentialVerifier;
