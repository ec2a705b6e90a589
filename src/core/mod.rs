//! Core logger types

pub mod buffer;
pub mod diagnostics;
pub mod encoder;
pub mod error;
pub mod field;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod options;
pub mod output_format;
pub mod overflow_policy;
pub mod record;
pub mod registry;
pub mod sampling;
pub mod stack;
pub mod timestamp;
pub mod worker;

pub use buffer::{Buffer, Pool, Pooled, PooledBuffer, Recycle};
pub use diagnostics::{DiagnosticSink, ErrorReporter, StderrSink};
pub use encoder::{ArrayEncoder, ArrayMarshaler, JsonEncoder, ObjectEncoder, ObjectMarshaler};
pub use error::{LoggerError, Result};
pub use field::{Field, FieldKind, Shared, StrList, Value};
pub use log_level::{AtomicLevel, LogLevel};
pub use logger::{ContextExtractor, Logger, LoggerBuilder, LoggerConfig};
pub use metrics::WorkerMetrics;
pub use options::LoggerOptions;
pub use output_format::OutputFormat;
pub use overflow_policy::OverflowPolicy;
pub use record::{FieldSet, Header, PreEncoded, Record, RecordScratch, StackFrame};
pub use registry::WorkerRegistry;
pub use sampling::{Sampler, SamplerHook, SamplerMetrics, SamplingConfig, SamplingDecision};
pub use stack::{
    long_caller, long_caller_formatter, short_caller, short_caller_formatter, CallerFormatter,
    CallerInfo, MAX_STACK_FRAMES,
};
pub use timestamp::{system_time, TimeSource, TimestampFormat};
pub use worker::{Destination, DirectWriter, Worker, WorkerOptions, WorkerState};
