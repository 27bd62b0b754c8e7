//! Core types for the tracepoint bridge.
//!
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Tool identity and observability configuration

mod config;
mod errors;

pub use config::{
    Config, ObservabilityConfig, ENV_CONFIG_FILE, ENV_LOG_FILTER, ENV_LOG_FORMAT, ENV_TOOL_NAME,
};
pub use errors::{Error, Result};
