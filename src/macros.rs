//! Logging macros for ergonomic log message formatting.
//!
//! These macros take a `format!`-style message and an optional field tail
//! after a semicolon. The message is only formatted when the level is
//! enabled.
//!
//! # Examples
//!
//! ```
//! use rust_fast_logger::output::SharedWriter;
//! use rust_fast_logger::{info, warn, Logger};
//!
//! let out = SharedWriter::new();
//! let logger = Logger::builder().output(out.clone()).build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments and fields
//! let port = 8080;
//! info!(logger, "Listening on port {}", port; "tls" => true);
//! warn!(logger, "Retry attempt {} of {}", 3, 5; "host" => "db-1", "backoff_ms" => 250);
//!
//! assert_eq!(
//!     out.lines(),
//!     vec![
//!         "INFO Server started",
//!         "INFO Listening on port 8080 tls=true",
//!         "WARN Retry attempt 3 of 5 host=db-1 backoff_ms=250",
//!     ]
//! );
//! ```

/// Log a message at an explicit level.
///
/// # Examples
///
/// ```
/// # use rust_fast_logger::prelude::*;
/// # let logger = Logger::builder().output(std::io::sink()).build().unwrap();
/// use rust_fast_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Error, "Request failed"; "code" => 500, "path" => "/api");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $fmt:literal $(, $arg:expr)* ; $($key:expr => $value:expr),+ $(,)?) => {
        $logger.logf_with(
            $level,
            ::std::format_args!($fmt $(, $arg)*),
            &[$($crate::Value::from($key), $crate::Value::from($value)),+],
        )
    };
    ($logger:expr, $level:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $logger.logf($level, ::std::format_args!($fmt $(, $arg)*))
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use rust_fast_logger::prelude::*;
/// # let logger = Logger::builder().level(LogLevel::Debug).output(std::io::sink()).build().unwrap();
/// use rust_fast_logger::debug;
/// debug!(logger, "Debug information");
/// debug!(logger, "Counter value: {}", 10; "shard" => 3);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use rust_fast_logger::prelude::*;
/// # let logger = Logger::builder().output(std::io::sink()).build().unwrap();
/// use rust_fast_logger::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_fast_logger::prelude::*;
/// # let logger = Logger::builder().output(std::io::sink()).build().unwrap();
/// use rust_fast_logger::warn;
/// warn!(logger, "Low disk space"; "free_mb" => 120);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use rust_fast_logger::prelude::*;
/// # let logger = Logger::builder().output(std::io::sink()).build().unwrap();
/// use rust_fast_logger::error;
/// error!(logger, "Failed to connect to database");
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}
