//! Timestamp formatting utilities
//!
//! The common layouts are written digit by digit straight into the record
//! buffer; only [`TimestampFormat::Custom`] goes through chrono's strftime
//! machinery.

use crate::core::buffer::Buffer;
use crate::core::error::LoggerError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::Arc;

/// Timestamp layout for record output.
///
/// # Examples
///
/// ```
/// use rust_fast_logger::TimestampFormat;
///
/// let format: TimestampFormat = "unix_milli".parse().unwrap();
/// assert!(format.is_numeric());
///
/// // Anything containing a strftime specifier is a custom layout.
/// let format: TimestampFormat = "%d/%b/%Y:%H:%M:%S".parse().unwrap();
/// assert!(matches!(format, TimestampFormat::Custom(_)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimestampFormat {
    /// `2025/01/08 10:30:45`
    #[default]
    Default,

    /// `2025-01-08T10:30:45Z`
    Rfc3339,

    /// `2025-01-08T10:30:45.123456789Z`, trailing fractional zeros trimmed
    Rfc3339Nano,

    /// Seconds since the Unix epoch; a bare number in JSON.
    Unix,

    /// Milliseconds since the Unix epoch; a bare number in JSON.
    UnixMilli,

    /// Validated strftime layout.
    Custom(String),
}

impl TimestampFormat {
    /// Build a custom layout, rejecting unknown specifiers.
    pub fn custom(layout: impl Into<String>) -> Result<Self, LoggerError> {
        let layout = layout.into();
        if StrftimeItems::new(&layout).any(|item| matches!(item, Item::Error)) {
            return Err(LoggerError::config(
                "time_format",
                format!("invalid strftime layout '{}'", layout),
            ));
        }
        Ok(TimestampFormat::Custom(layout))
    }

    /// Check if this is a Unix-based numeric format
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, TimestampFormat::Unix | TimestampFormat::UnixMilli)
    }

    /// Format into a fresh string.
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        let mut buf = Buffer::with_capacity(40);
        append_time(&mut buf, *datetime, self);
        String::from_utf8_lossy(buf.as_bytes()).into_owned()
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampFormat::Default => f.write_str("default"),
            TimestampFormat::Rfc3339 => f.write_str("rfc3339"),
            TimestampFormat::Rfc3339Nano => f.write_str("rfc3339nano"),
            TimestampFormat::Unix => f.write_str("unix"),
            TimestampFormat::UnixMilli => f.write_str("unix_milli"),
            TimestampFormat::Custom(layout) => f.write_str(layout),
        }
    }
}

impl FromStr for TimestampFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "default" => Ok(TimestampFormat::Default),
            "rfc3339" => Ok(TimestampFormat::Rfc3339),
            "rfc3339nano" | "rfc3339_nano" => Ok(TimestampFormat::Rfc3339Nano),
            "unix" => Ok(TimestampFormat::Unix),
            "unix_milli" => Ok(TimestampFormat::UnixMilli),
            layout if layout.contains('%') => TimestampFormat::custom(layout),
            other => Err(LoggerError::config(
                "time_format",
                format!("unknown time format '{}'", other),
            )),
        }
    }
}

impl TryFrom<String> for TimestampFormat {
    type Error = LoggerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimestampFormat> for String {
    fn from(value: TimestampFormat) -> Self {
        value.to_string()
    }
}

/// Source of the current time.
pub type TimeSource = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall-clock time source.
pub fn system_time() -> TimeSource {
    Arc::new(Utc::now)
}

const DIGIT_PAIRS: &[u8; 200] = b"\
0001020304050607080910111213141516171819\
2021222324252627282930313233343536373839\
4041424344454647484950515253545556575859\
6061626364656667686970717273747576777879\
8081828384858687888990919293949596979899";

#[inline]
fn push_2(buf: &mut Buffer, value: u32) {
    let i = (value % 100) as usize * 2;
    buf.extend_from_slice(&DIGIT_PAIRS[i..i + 2]);
}

fn push_year(buf: &mut Buffer, year: i32) {
    if (0..=9999).contains(&year) {
        push_2(buf, year as u32 / 100);
        push_2(buf, year as u32 % 100);
    } else {
        buf.push_i64(i64::from(year));
    }
}

fn push_date(buf: &mut Buffer, t: &DateTime<Utc>, sep: u8) {
    push_year(buf, t.year());
    buf.push(sep);
    push_2(buf, t.month());
    buf.push(sep);
    push_2(buf, t.day());
}

fn push_clock(buf: &mut Buffer, t: &DateTime<Utc>) {
    push_2(buf, t.hour());
    buf.push(b':');
    push_2(buf, t.minute());
    buf.push(b':');
    push_2(buf, t.second());
}

fn push_fraction(buf: &mut Buffer, nanos: u32) {
    if nanos == 0 {
        return;
    }
    let mut digits = [b'0'; 9];
    let mut rest = nanos.min(999_999_999);
    for slot in digits.iter_mut().rev() {
        *slot = b'0' + (rest % 10) as u8;
        rest /= 10;
    }
    let end = digits.iter().rposition(|&d| d != b'0').map_or(0, |i| i + 1);
    buf.push(b'.');
    buf.extend_from_slice(&digits[..end]);
}

/// Append `t` to `buf` in `format`, without quoting.
pub fn append_time(buf: &mut Buffer, t: DateTime<Utc>, format: &TimestampFormat) {
    match format {
        TimestampFormat::Default => {
            push_date(buf, &t, b'/');
            buf.push(b' ');
            push_clock(buf, &t);
        }
        TimestampFormat::Rfc3339 => {
            push_date(buf, &t, b'-');
            buf.push(b'T');
            push_clock(buf, &t);
            buf.push(b'Z');
        }
        TimestampFormat::Rfc3339Nano => {
            push_date(buf, &t, b'-');
            buf.push(b'T');
            push_clock(buf, &t);
            push_fraction(buf, t.timestamp_subsec_nanos());
            buf.push(b'Z');
        }
        TimestampFormat::Unix => buf.push_i64(t.timestamp()),
        TimestampFormat::UnixMilli => buf.push_i64(t.timestamp_millis()),
        TimestampFormat::Custom(layout) => {
            // Layouts are validated on construction; a failure here only truncates.
            let _ = write!(buf, "{}", t.format(layout));
        }
    }
}
