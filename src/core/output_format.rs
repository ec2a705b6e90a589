//! Output format selection
//!
//! - Text: human-readable `TIME LEVEL <caller> prefix: message key=value`
//! - Json: one JSON object per line

use crate::core::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format for log records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format (default)
    ///
    /// Example: `2025/01/08 10:30:45 INFO api: request served path=/users status=200`
    #[default]
    Text,

    /// JSON format for machine processing
    ///
    /// Example: `{"time":"2025/01/08 10:30:45","level":"info","prefix":"api","msg":"request served","status":200}`
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(LoggerError::config(
                "formatter",
                format!("unknown output format '{}'", other),
            )),
        }
    }
}
