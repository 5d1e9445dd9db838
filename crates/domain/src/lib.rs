//! Shared domain types for the switchboard chat orchestration engine.
//!
//! Everything here is provider-agnostic: the canonical conversation types,
//! the decoded stream-chunk shape, the error taxonomy, and configuration.
//! Provider adapters and the turn engine build on these without ever
//! agreeing on a wire format.

pub mod config;
pub mod content;
pub mod error;
pub mod message;
pub mod provider;
pub mod request;
pub mod stream;

pub use error::{Error, Result};
