//! Mail client for testing and integration purposes.
//!
//! Each request is written as one dot-terminated frame and each response is
//! read as a single transmission, which is how the server answers.
//!
//! # Examples
//!
//! ```no_run
//! use pigeon_mail::client::MailClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = MailClient::connect("127.0.0.1:6543").await?;
//!
//! if client.login("alice", "wonderland").await? {
//!     client.send("bob", "hello", "hi there").await?;
//!
//!     let listing = client.list().await?;
//!     println!("{} messages", listing.total);
//! }
//!
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod mail_client;

pub use error::{ClientError, Result};
pub use mail_client::{Listing, MailClient};
