//! Domain layer for the rule commander
//!
//! This module contains core models, ports and error types.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, LlmError};
