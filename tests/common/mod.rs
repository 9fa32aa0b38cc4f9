//! Common test utilities for sheet-relay integration tests

#[allow(dead_code)]
pub mod service;

pub use service::*;
