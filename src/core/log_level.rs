//! Log level definitions

use crate::core::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::Arc;

/// Severity of a log event.
///
/// Levels are ordered by severity; `Print` sorts above every real level so it
/// always passes the level gate and renders without a level label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[repr(i8)]
pub enum LogLevel {
    Debug = -1,
    #[default]
    Info = 0,
    Warn = 1,
    Error = 2,
    /// Development panic: logged like an error, never aborts.
    DPanic = 3,
    /// Logged, synced, then the calling thread panics.
    Panic = 4,
    /// Logged, every worker flushed, then the process exits with status 1.
    Fatal = 5,
    /// Unlabelled output used by the print helpers.
    Print = 100,
}

/// Number of levels the sampler keeps counters for (`Debug..=Fatal`).
pub(crate) const SAMPLED_LEVELS: usize = 7;

impl LogLevel {
    /// Lower-case name, as written in JSON output.
    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::DPanic => "dpanic",
            LogLevel::Panic => "panic",
            LogLevel::Fatal => "fatal",
            LogLevel::Print => "",
        }
    }

    /// Four-character upper-case label used by the text formatter.
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBU",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERRO",
            LogLevel::DPanic => "DPAN",
            LogLevel::Panic => "PANI",
            LogLevel::Fatal => "FATA",
            LogLevel::Print => "",
        }
    }

    /// Whether this level is rendered with a label at all.
    #[inline]
    pub fn is_labelled(&self) -> bool {
        *self != LogLevel::Print
    }

    /// Panic and fatal carry termination side effects.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, LogLevel::Panic | LogLevel::Fatal)
    }

    /// Numeric severity.
    #[inline]
    pub fn as_i8(&self) -> i8 {
        *self as i8
    }

    fn from_i8(value: i8) -> Self {
        match value {
            i8::MIN..=-1 => LogLevel::Debug,
            0 => LogLevel::Info,
            1 => LogLevel::Warn,
            2 => LogLevel::Error,
            3 => LogLevel::DPanic,
            4 => LogLevel::Panic,
            5..=99 => LogLevel::Fatal,
            _ => LogLevel::Print,
        }
    }

    /// Row in the sampler's counter table, `None` for unsampled levels.
    pub(crate) fn sampler_slot(&self) -> Option<usize> {
        match self {
            LogLevel::Print => None,
            level => Some((level.as_i8() + 1) as usize),
        }
    }

    /// Terminal color for the level label.
    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Debug => BrightBlack,
            LogLevel::Info => Cyan,
            LogLevel::Warn => Yellow,
            LogLevel::Error => Red,
            LogLevel::DPanic | LogLevel::Panic => Magenta,
            LogLevel::Fatal => BrightRed,
            LogLevel::Print => White,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggerError;

    /// Case-insensitive; the empty string parses to `Info`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "dpanic" => Ok(LogLevel::DPanic),
            "panic" => Ok(LogLevel::Panic),
            "fatal" => Ok(LogLevel::Fatal),
            _ => Err(LoggerError::invalid_level(s)),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = LoggerError;

    fn try_from(value: String) -> Result<Self, LoggerError> {
        value.parse()
    }
}

/// Minimum level shared by a logger and everything derived from it.
///
/// Reads are a single relaxed atomic load, so the level gate costs nothing
/// on the hot path.
#[derive(Debug, Clone)]
pub struct AtomicLevel(Arc<AtomicI8>);

impl AtomicLevel {
    /// Shared level starting at `level`.
    pub fn new(level: LogLevel) -> Self {
        Self(Arc::new(AtomicI8::new(level.as_i8())))
    }

    /// Current minimum level.
    #[inline]
    pub fn get(&self) -> LogLevel {
        LogLevel::from_i8(self.0.load(Ordering::Relaxed))
    }

    /// Change the level for every holder of this handle.
    pub fn set(&self, level: LogLevel) {
        self.0.store(level.as_i8(), Ordering::Relaxed);
    }

    /// Whether `level` passes the gate.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level.as_i8() >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for AtomicLevel {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}
