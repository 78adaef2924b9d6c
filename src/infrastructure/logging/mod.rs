//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty formatting on stderr
//! - Optional rolling file output
//! - Secret scrubbing on every writer
//! - Retention-based pruning of old log files

pub mod config;
pub mod logger;
pub mod retention;
pub mod secret_scrubbing;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
pub use retention::prune_old_logs;
pub use secret_scrubbing::{ScrubbingMakeWriter, SecretScrubber};
