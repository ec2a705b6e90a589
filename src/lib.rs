//! # Rust Fast Logger
//!
//! A high-throughput structured logging engine.
//!
//! ## Features
//!
//! - **Zero-allocation encoding**: text and JSON records are written straight
//!   into pooled buffers
//! - **Asynchronous delivery**: one worker thread per destination with a
//!   bounded queue and a configurable overflow policy
//! - **Structured fields**: typed fields, loose key/value pairs and nested
//!   objects through the [`ObjectMarshaler`] and [`ArrayMarshaler`] traits
//! - **Sampling**: per-level, per-message rate limiting with a time window
//!
//! ## Example
//!
//! ```
//! use rust_fast_logger::output::SharedWriter;
//! use rust_fast_logger::prelude::*;
//!
//! let out = SharedWriter::new();
//! let logger = Logger::builder().output(out.clone()).build().unwrap();
//!
//! logger.info_fields("request served", &[Field::int("status", 200)]);
//! logger.sync().unwrap();
//!
//! assert_eq!(out.lines(), vec!["INFO request served status=200"]);
//! ```

#[cfg(feature = "log-bridge")]
pub mod bridge;
pub mod core;
pub mod format;
pub mod macros;
pub mod output;

pub mod prelude {
    pub use crate::core::{
        ArrayEncoder, ArrayMarshaler, Field, FieldKind, LogLevel, Logger, LoggerBuilder,
        LoggerError, LoggerOptions, ObjectEncoder, ObjectMarshaler, OutputFormat, OverflowPolicy,
        Result, Sampler, SamplingConfig, TimestampFormat, Value,
    };
}

#[cfg(feature = "log-bridge")]
pub use bridge::LogBridge;
pub use core::{
    ArrayEncoder, ArrayMarshaler, AtomicLevel, Buffer, CallerFormatter, CallerInfo,
    ContextExtractor, DiagnosticSink, Field, FieldKind, LogLevel, Logger, LoggerBuilder,
    LoggerConfig, LoggerError, LoggerOptions, ObjectEncoder, ObjectMarshaler, OutputFormat,
    OverflowPolicy, PooledBuffer, Result, Sampler, SamplerHook, SamplerMetrics, SamplingConfig,
    SamplingDecision, TimeSource, TimestampFormat, Value, WorkerMetrics, WorkerRegistry,
};
pub use format::Styles;
