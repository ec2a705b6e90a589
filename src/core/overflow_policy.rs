//! What a submitter does when the worker queue is full

use crate::core::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy for handling queue overflow in async logging
///
/// # Example
///
/// ```
/// use rust_fast_logger::OverflowPolicy;
///
/// let policy: OverflowPolicy = "drop".parse().unwrap();
/// assert_eq!(policy, OverflowPolicy::Drop);
/// assert_eq!(OverflowPolicy::default(), OverflowPolicy::Sync);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Write on the calling thread after draining the queued backlog.
    ///
    /// Nothing is lost and same-thread order is kept; the caller pays for
    /// the I/O while the queue is saturated.
    #[default]
    Sync,

    /// Release the buffer unwritten and count it.
    Drop,

    /// Wait for queue space.
    Block,
}

impl OverflowPolicy {
    /// Name as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            OverflowPolicy::Sync => "sync",
            OverflowPolicy::Drop => "drop",
            OverflowPolicy::Block => "block",
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(OverflowPolicy::Sync),
            "drop" => Ok(OverflowPolicy::Drop),
            "block" => Ok(OverflowPolicy::Block),
            other => Err(LoggerError::config(
                "overflow_policy",
                format!("unknown policy '{}'", other),
            )),
        }
    }
}
