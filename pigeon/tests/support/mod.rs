//! Test support utilities for E2E testing
//!
//! This module provides infrastructure for end-to-end testing of Pigeon,
//! starting a server from a configuration file and talking to it over TCP.

pub mod harness;

pub use harness::E2ETestHarness;
