pub mod config;
pub mod error;
pub mod mailbox;
pub mod record;
pub mod safe_name;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use mailbox::BoxKind;
pub use record::MessageRecord;
pub use store::Mailstore;
