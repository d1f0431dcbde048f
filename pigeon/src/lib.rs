//! The Pigeon mail server.
//!
//! [`Pigeon`](controller::Pigeon) is the top-level configuration: the mail
//! listeners, where mailboxes live, and which directory vouches for users.

pub mod config;
pub mod controller;

pub use controller::Pigeon;
