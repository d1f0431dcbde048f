//! Configuration types shared between listeners and sessions.

pub mod timeouts;

pub use timeouts::SessionTimeouts;
