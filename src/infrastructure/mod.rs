//! Infrastructure layer module
//!
//! External integrations and process-wide plumbing:
//! - Anthropic Messages API client (rate limiting, retry)
//! - Configuration management
//! - Logging infrastructure
//!
//! Implementations here satisfy the port traits defined in the domain layer.

pub mod claude;
pub mod config;
pub mod logging;
