//! Serializable logger options
//!
//! Everything here can come from a config file. Hooks and destinations are
//! not serializable and are set on the builder directly.

use crate::core::error::Result;
use crate::core::log_level::LogLevel;
use crate::core::output_format::OutputFormat;
use crate::core::overflow_policy::OverflowPolicy;
use crate::core::timestamp::TimestampFormat;
use crate::core::worker::DEFAULT_QUEUE_CAPACITY;
use serde::{Deserialize, Serialize};

/// Declarative logger configuration.
///
/// # Example
///
/// ```
/// use rust_fast_logger::{LogLevel, LoggerOptions, OverflowPolicy};
///
/// let options: LoggerOptions = serde_json::from_str(
///     r#"{"level": "debug", "async": true, "overflow_policy": "drop"}"#,
/// ).unwrap();
///
/// assert_eq!(options.level, LogLevel::Debug);
/// assert_eq!(options.overflow_policy, OverflowPolicy::Drop);
/// assert_eq!(options.buffer_size, 8192);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerOptions {
    pub level: LogLevel,

    /// Queue capacity of the async worker.
    pub buffer_size: usize,

    pub overflow_policy: OverflowPolicy,

    /// Deliver through a background worker instead of writing on the caller.
    #[serde(rename = "async")]
    pub async_mode: bool,

    pub report_timestamp: bool,
    pub time_format: TimestampFormat,
    pub report_caller: bool,
    pub caller_offset: usize,
    pub report_stacktrace: bool,
    pub prefix: String,
    pub formatter: OutputFormat,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            buffer_size: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::Sync,
            async_mode: false,
            report_timestamp: false,
            time_format: TimestampFormat::Default,
            report_caller: false,
            caller_offset: 0,
            report_stacktrace: false,
            prefix: String::new(),
            formatter: OutputFormat::Text,
        }
    }
}

impl LoggerOptions {
    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }
}
