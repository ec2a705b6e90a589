//! Logger facade
//!
//! A [`Logger`] gates each call on its level and sampler, encodes the record
//! into a pooled [`Buffer`] on the calling thread and hands the buffer to its
//! sink: a background [`Worker`] in async mode, or a mutex-serialized
//! [`DirectWriter`] otherwise.

use crate::core::buffer::{Buffer, PooledBuffer};
use crate::core::diagnostics::{DiagnosticSink, StderrSink};
use crate::core::error::{LoggerError, Result};
use crate::core::field::{Field, Value};
use crate::core::log_level::{AtomicLevel, LogLevel};
use crate::core::metrics::WorkerMetrics;
use crate::core::options::LoggerOptions;
use crate::core::output_format::OutputFormat;
use crate::core::overflow_policy::OverflowPolicy;
use crate::core::record::{FieldSet, Header, PreEncoded, Record, RecordScratch};
use crate::core::registry::WorkerRegistry;
use crate::core::sampling::{Sampler, SamplerMetrics};
use crate::core::stack::{self, short_caller_formatter, CallerFormatter};
use crate::core::timestamp::{system_time, TimeSource, TimestampFormat};
use crate::core::worker::{Destination, DirectWriter, Worker, WorkerOptions, DEFAULT_QUEUE_CAPACITY};
use crate::format::{self, Styles};
use crate::output;
use arc_swap::ArcSwap;
use std::any::Any;
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Turns a request context into fields appended after the logger's own.
pub type ContextExtractor = Arc<dyn Fn(&dyn Any) -> Vec<Field<'static>> + Send + Sync>;

/// Per-logger settings, swapped as a whole on every change.
#[derive(Clone)]
pub struct LoggerConfig {
    pub prefix: String,
    pub time_source: TimeSource,
    pub time_format: TimestampFormat,
    pub formatter: OutputFormat,
    pub report_timestamp: bool,
    pub report_caller: bool,
    /// Frames to skip above the logging call when resolving the caller.
    pub caller_offset: usize,
    pub caller_formatter: CallerFormatter,
    pub report_stacktrace: bool,
    pub context_extractor: Option<ContextExtractor>,
    pub styles: Styles,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            time_source: system_time(),
            time_format: TimestampFormat::Default,
            formatter: OutputFormat::Text,
            report_timestamp: false,
            report_caller: false,
            caller_offset: 0,
            caller_formatter: short_caller_formatter(),
            report_stacktrace: false,
            context_extractor: None,
            styles: Styles::plain(),
        }
    }
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("prefix", &self.prefix)
            .field("time_format", &self.time_format)
            .field("formatter", &self.formatter)
            .field("report_timestamp", &self.report_timestamp)
            .field("report_caller", &self.report_caller)
            .field("caller_offset", &self.caller_offset)
            .field("report_stacktrace", &self.report_stacktrace)
            .field("context_extractor", &self.context_extractor.is_some())
            .finish_non_exhaustive()
    }
}

/// Fields attached to a logger, with their JSON form when it was computed.
#[derive(Debug, Default)]
struct AttachedFields {
    loose: Vec<Value<'static>>,
    typed: Vec<Field<'static>>,
    pre_encoded: Option<(TimestampFormat, PreEncoded)>,
}

impl AttachedFields {
    fn new(loose: Vec<Value<'static>>, typed: Vec<Field<'static>>, config: &LoggerConfig) -> Self {
        let pre_encoded = (config.formatter == OutputFormat::Json
            && !(loose.is_empty() && typed.is_empty()))
        .then(|| {
            (
                config.time_format.clone(),
                PreEncoded::build(&loose, &typed, &config.time_format),
            )
        });
        Self {
            loose,
            typed,
            pre_encoded,
        }
    }

    /// The pre-encoded fragments, if they were rendered with `time_format`.
    fn pre_encoded_for(&self, time_format: &TimestampFormat) -> Option<&PreEncoded> {
        match &self.pre_encoded {
            Some((encoded_with, fragments)) if encoded_with == time_format => Some(fragments),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Sink {
    Async(Arc<Worker>),
    Direct(Arc<DirectWriter>),
}

impl Sink {
    fn submit(&self, buf: PooledBuffer) {
        match self {
            Sink::Async(worker) => worker.submit(buf),
            Sink::Direct(writer) => writer.write(&buf),
        }
    }

    fn sync(&self) -> Result<()> {
        match self {
            Sink::Async(worker) => worker.sync(),
            Sink::Direct(writer) => writer.flush(),
        }
    }

    fn metrics(&self) -> &WorkerMetrics {
        match self {
            Sink::Async(worker) => worker.metrics(),
            Sink::Direct(writer) => writer.metrics(),
        }
    }
}

/// Structured logger handle.
///
/// Handles derived with [`with`](Logger::with), [`with_fields`](Logger::with_fields),
/// [`with_prefix`](Logger::with_prefix), [`with_sampler`](Logger::with_sampler)
/// or `clone` share the destination and the level. The destination is
/// released when the last handle is closed or dropped.
///
/// # Example
///
/// ```
/// use rust_fast_logger::output::SharedWriter;
/// use rust_fast_logger::{Logger, LogLevel, Value};
///
/// let out = SharedWriter::new();
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .output(out.clone())
///     .build()
///     .unwrap();
///
/// let db = logger.with_prefix("db");
/// db.info("connected", &[Value::from("host"), Value::from("10.0.0.1")]);
/// db.sync().unwrap();
///
/// assert_eq!(out.lines(), vec!["INFO db: connected host=10.0.0.1"]);
/// ```
pub struct Logger {
    config: ArcSwap<LoggerConfig>,
    level: AtomicLevel,
    fields: Arc<AttachedFields>,
    sink: Sink,
    sampler: Option<Arc<Sampler>>,
    registry: Arc<WorkerRegistry>,
    diagnostics: Arc<dyn DiagnosticSink>,
    closed: AtomicBool,
}

impl Logger {
    /// Start configuring a logger.
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Log `message` at `level` with loose key/value pairs.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: &str, keyvals: &[Value<'_>]) {
        self.dispatch(level, message, keyvals, &[], None);
    }

    /// Log `message` at `level` with typed fields.
    #[track_caller]
    pub fn log_fields(&self, level: LogLevel, message: &str, fields: &[Field<'_>]) {
        self.dispatch(level, message, &[], fields, None);
    }

    /// Log with fields extracted from `context` by the configured extractor.
    #[track_caller]
    pub fn log_context(
        &self,
        context: &dyn Any,
        level: LogLevel,
        message: &str,
        keyvals: &[Value<'_>],
    ) {
        self.dispatch(level, message, keyvals, &[], Some(context));
    }

    /// Like [`log_context`](Logger::log_context), with typed fields.
    #[track_caller]
    pub fn log_context_fields(
        &self,
        context: &dyn Any,
        level: LogLevel,
        message: &str,
        fields: &[Field<'_>],
    ) {
        self.dispatch(level, message, &[], fields, Some(context));
    }

    /// Log a `format_args!` message. Nothing is formatted below the level.
    #[track_caller]
    pub fn logf(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.logf_with(level, args, &[]);
    }

    /// [`logf`](Logger::logf) with loose key/value pairs.
    #[track_caller]
    pub fn logf_with(&self, level: LogLevel, args: fmt::Arguments<'_>, keyvals: &[Value<'_>]) {
        if !self.level.enabled(level) {
            return;
        }
        match args.as_str() {
            Some(message) => self.dispatch(level, message, keyvals, &[], None),
            None => self.dispatch(level, &args.to_string(), keyvals, &[], None),
        }
    }

    /// Log at debug level.
    #[track_caller]
    pub fn debug(&self, message: &str, keyvals: &[Value<'_>]) {
        self.dispatch(LogLevel::Debug, message, keyvals, &[], None);
    }

    /// Log at info level.
    #[track_caller]
    pub fn info(&self, message: &str, keyvals: &[Value<'_>]) {
        self.dispatch(LogLevel::Info, message, keyvals, &[], None);
    }

    /// Log at warn level.
    #[track_caller]
    pub fn warn(&self, message: &str, keyvals: &[Value<'_>]) {
        self.dispatch(LogLevel::Warn, message, keyvals, &[], None);
    }

    /// Log at error level.
    #[track_caller]
    pub fn error(&self, message: &str, keyvals: &[Value<'_>]) {
        self.dispatch(LogLevel::Error, message, keyvals, &[], None);
    }

    /// Logged like an error; never aborts.
    #[track_caller]
    pub fn dpanic(&self, message: &str, keyvals: &[Value<'_>]) {
        self.dispatch(LogLevel::DPanic, message, keyvals, &[], None);
    }

    /// Log, sync the destination, then panic with `message`.
    #[track_caller]
    pub fn panic(&self, message: &str, keyvals: &[Value<'_>]) {
        self.dispatch(LogLevel::Panic, message, keyvals, &[], None);
    }

    /// Log, flush every registered worker, then exit the process with status 1.
    #[track_caller]
    pub fn fatal(&self, message: &str, keyvals: &[Value<'_>]) {
        self.dispatch(LogLevel::Fatal, message, keyvals, &[], None);
    }

    /// Log without a level label, regardless of the minimum level.
    #[track_caller]
    pub fn print(&self, message: &str, keyvals: &[Value<'_>]) {
        self.dispatch(LogLevel::Print, message, keyvals, &[], None);
    }

    /// Debug record with typed fields.
    #[track_caller]
    pub fn debug_fields(&self, message: &str, fields: &[Field<'_>]) {
        self.dispatch(LogLevel::Debug, message, &[], fields, None);
    }

    /// Info record with typed fields.
    #[track_caller]
    pub fn info_fields(&self, message: &str, fields: &[Field<'_>]) {
        self.dispatch(LogLevel::Info, message, &[], fields, None);
    }

    /// Warn record with typed fields.
    #[track_caller]
    pub fn warn_fields(&self, message: &str, fields: &[Field<'_>]) {
        self.dispatch(LogLevel::Warn, message, &[], fields, None);
    }

    /// Error record with typed fields.
    #[track_caller]
    pub fn error_fields(&self, message: &str, fields: &[Field<'_>]) {
        self.dispatch(LogLevel::Error, message, &[], fields, None);
    }

    /// DPanic record with typed fields.
    #[track_caller]
    pub fn dpanic_fields(&self, message: &str, fields: &[Field<'_>]) {
        self.dispatch(LogLevel::DPanic, message, &[], fields, None);
    }

    /// Log with typed fields, sync, then panic.
    #[track_caller]
    pub fn panic_fields(&self, message: &str, fields: &[Field<'_>]) {
        self.dispatch(LogLevel::Panic, message, &[], fields, None);
    }

    /// Log with typed fields, flush every worker, then exit with status 1.
    #[track_caller]
    pub fn fatal_fields(&self, message: &str, fields: &[Field<'_>]) {
        self.dispatch(LogLevel::Fatal, message, &[], fields, None);
    }

    /// Unlabelled record with typed fields; never filtered by level.
    #[track_caller]
    pub fn print_fields(&self, message: &str, fields: &[Field<'_>]) {
        self.dispatch(LogLevel::Print, message, &[], fields, None);
    }

    #[track_caller]
    fn dispatch(
        &self,
        level: LogLevel,
        message: &str,
        keyvals: &[Value<'_>],
        typed: &[Field<'_>],
        context: Option<&dyn Any>,
    ) {
        if !self.level.enabled(level) || self.closed.load(Ordering::Acquire) {
            return;
        }

        let config = self.config.load();
        // The sampler windows on the clock even when timestamps are off.
        let now = (config.report_timestamp || self.sampler.is_some())
            .then(|| (config.time_source)());

        if let (Some(sampler), Some(now)) = (&self.sampler, now) {
            if !level.is_terminal() && !sampler.check(level, message, now) {
                return;
            }
        }

        let context_fields = match (context, &config.context_extractor) {
            (Some(context), Some(extract)) => extract(context),
            _ => Vec::new(),
        };

        let header = Header {
            time: now.filter(|_| config.report_timestamp),
            level,
            prefix: &config.prefix,
            message,
            time_format: &config.time_format,
        };
        let fields = FieldSet {
            logger_loose: &self.fields.loose,
            call_loose: keyvals,
            logger_typed: &self.fields.typed,
            context_typed: &context_fields,
            call_typed: typed,
        };
        let pre_encoded = self.fields.pre_encoded_for(&config.time_format);

        let mut buf = Buffer::acquire();
        if config.report_caller || config.report_stacktrace {
            let mut scratch = RecordScratch::acquire();
            if config.report_caller {
                stack::resolve_caller(
                    Location::caller(),
                    config.caller_offset,
                    &config.caller_formatter,
                    &mut scratch.caller,
                );
            }
            if config.report_stacktrace
                && ((level.is_labelled() && level >= LogLevel::Error) || fields.has_error())
            {
                stack::capture_stack(&mut scratch.stack);
            }
            let record = Record {
                header,
                caller: &scratch.caller,
                stack: &scratch.stack,
                pre_encoded,
                formatter: config.formatter,
                fields,
            };
            record.encode(&mut buf, &config.styles);
        } else {
            format::encode(
                &mut buf,
                config.formatter,
                &header,
                &fields,
                pre_encoded,
                &config.styles,
            );
        }
        self.sink.submit(buf);

        match level {
            LogLevel::Panic => {
                self.flush_before_exit(level);
                panic!("{}", message);
            }
            LogLevel::Fatal => {
                self.flush_before_exit(level);
                std::process::exit(1);
            }
            _ => {}
        }
    }

    /// Sync this logger; fatal also flushes every registered worker.
    fn flush_before_exit(&self, level: LogLevel) {
        if let Err(err) = self.sink.sync() {
            self.diagnostics
                .report(&format!("flush before {} failed: {}", level, err));
        }
        if level == LogLevel::Fatal {
            if let Err(err) = self.registry.flush_all() {
                self.diagnostics
                    .report(&format!("flush_all before fatal exit failed: {}", err));
            }
        }
    }

    fn derive(
        &self,
        config: Arc<LoggerConfig>,
        fields: Arc<AttachedFields>,
        sampler: Option<Arc<Sampler>>,
    ) -> Logger {
        if let Sink::Async(worker) = &self.sink {
            worker.retain();
        }
        Logger {
            config: ArcSwap::new(config),
            level: self.level.clone(),
            fields,
            sink: self.sink.clone(),
            sampler,
            registry: Arc::clone(&self.registry),
            diagnostics: Arc::clone(&self.diagnostics),
            closed: AtomicBool::new(false),
        }
    }

    /// Derive a logger with loose key/value pairs appended to its fields.
    ///
    /// A trailing key without a value is dropped.
    #[must_use]
    pub fn with(&self, keyvals: &[Value<'static>]) -> Logger {
        let paired = keyvals.len() & !1;
        let config = self.config.load_full();
        let mut loose = self.fields.loose.clone();
        loose.extend_from_slice(&keyvals[..paired]);
        let fields = AttachedFields::new(loose, self.fields.typed.clone(), &config);
        self.derive(config, Arc::new(fields), self.sampler.clone())
    }

    /// Derive a logger with typed fields appended to its fields.
    #[must_use]
    pub fn with_fields(&self, fields: &[Field<'static>]) -> Logger {
        let config = self.config.load_full();
        let mut typed = self.fields.typed.clone();
        typed.extend_from_slice(fields);
        let fields = AttachedFields::new(self.fields.loose.clone(), typed, &config);
        self.derive(config, Arc::new(fields), self.sampler.clone())
    }

    /// Derive a logger with a different prefix.
    #[must_use]
    pub fn with_prefix(&self, prefix: impl Into<String>) -> Logger {
        let mut config = LoggerConfig::clone(&self.config.load());
        config.prefix = prefix.into();
        self.derive(
            Arc::new(config),
            Arc::clone(&self.fields),
            self.sampler.clone(),
        )
    }

    /// Derive a logger that consults `sampler` before encoding.
    #[must_use]
    pub fn with_sampler(&self, sampler: Sampler) -> Logger {
        self.derive(
            self.config.load_full(),
            Arc::clone(&self.fields),
            Some(Arc::new(sampler)),
        )
    }

    fn update(&self, change: impl Fn(&mut LoggerConfig)) {
        self.config.rcu(|current| {
            let mut next = LoggerConfig::clone(current);
            change(&mut next);
            next
        });
    }

    /// Current minimum level.
    pub fn level(&self) -> LogLevel {
        self.level.get()
    }

    /// Whether a call at `level` would be written (before sampling).
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.level.enabled(level) && !self.is_closed()
    }

    /// Change the minimum level of this logger and every handle sharing it.
    pub fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    /// Replace the prefix for this handle.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        self.update(|config| config.prefix.clone_from(&prefix));
    }

    /// Change how timestamps are rendered.
    pub fn set_time_format(&self, time_format: TimestampFormat) {
        self.update(|config| config.time_format = time_format.clone());
    }

    /// Change where timestamps come from.
    pub fn set_time_source(&self, time_source: TimeSource) {
        self.update(|config| config.time_source = Arc::clone(&time_source));
    }

    /// Switch between text and JSON output.
    ///
    /// Attached fields keep their JSON pre-encoding only if they were
    /// attached while the formatter was already JSON.
    pub fn set_formatter(&self, formatter: OutputFormat) {
        self.update(|config| config.formatter = formatter);
    }

    /// Turn timestamps on or off.
    pub fn set_report_timestamp(&self, report: bool) {
        self.update(|config| config.report_timestamp = report);
    }

    /// Turn caller reporting on or off.
    pub fn set_report_caller(&self, report: bool) {
        self.update(|config| config.report_caller = report);
    }

    /// Turn stack capture for error records on or off.
    pub fn set_report_stacktrace(&self, report: bool) {
        self.update(|config| config.report_stacktrace = report);
    }

    /// Frames to skip above the logging call when resolving the caller.
    pub fn set_caller_offset(&self, offset: usize) {
        self.update(|config| config.caller_offset = offset);
    }

    /// Change how the caller is rendered.
    pub fn set_caller_formatter(&self, formatter: CallerFormatter) {
        self.update(|config| config.caller_formatter = Arc::clone(&formatter));
    }

    /// Change how fields are pulled from a context value.
    pub fn set_context_extractor(&self, extractor: ContextExtractor) {
        self.update(|config| config.context_extractor = Some(Arc::clone(&extractor)));
    }

    /// Change the text formatter's styles.
    pub fn set_styles(&self, styles: Styles) {
        self.update(|config| config.styles = styles.clone());
    }

    /// Snapshot of the current settings.
    pub fn config(&self) -> Arc<LoggerConfig> {
        self.config.load_full()
    }

    /// Block until everything logged so far is written and flushed.
    pub fn sync(&self) -> Result<()> {
        self.sink.sync()
    }

    /// Release this handle. Idempotent.
    ///
    /// Closing the last handle on an async worker unregisters and stops it,
    /// draining whatever is still queued.
    pub fn close(&self) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        match &self.sink {
            Sink::Async(worker) => {
                if worker.release() {
                    self.registry.unregister(worker.id());
                    worker.stop();
                }
                Ok(())
            }
            Sink::Direct(writer) => writer.flush(),
        }
    }

    /// Whether [`close`](Logger::close) was called on this handle.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Delivery counters of the destination shared by this handle.
    pub fn metrics(&self) -> &WorkerMetrics {
        self.sink.metrics()
    }

    /// Sampler decisions, if a sampler is installed.
    pub fn sampler_metrics(&self) -> Option<&SamplerMetrics> {
        self.sampler.as_deref().map(Sampler::metrics)
    }

    /// Id of the background worker, if the logger is asynchronous.
    pub fn worker_id(&self) -> Option<u64> {
        match &self.sink {
            Sink::Async(worker) => Some(worker.id()),
            Sink::Direct(_) => None,
        }
    }
}

impl Clone for Logger {
    fn clone(&self) -> Self {
        self.derive(
            self.config.load_full(),
            Arc::clone(&self.fields),
            self.sampler.clone(),
        )
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            eprintln!("[LOGGER ERROR] Failed to flush on close: {}", e);
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level.get())
            .field("config", &*self.config.load())
            .field("fields", &(self.fields.loose.len() / 2 + self.fields.typed.len()))
            .field("sink", &self.sink)
            .field("sampler", &self.sampler)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for [`Logger`]
///
/// Defaults: level info, text output to stderr, synchronous delivery, no
/// timestamp.
///
/// # Example
///
/// ```
/// use rust_fast_logger::output::SharedWriter;
/// use rust_fast_logger::{Field, Logger, OutputFormat, OverflowPolicy};
///
/// let out = SharedWriter::new();
/// let logger = Logger::builder()
///     .output(out.clone())
///     .async_mode(true)
///     .queue_capacity(1024)
///     .overflow_policy(OverflowPolicy::Drop)
///     .formatter(OutputFormat::Json)
///     .fields(vec![Field::string("service", "billing")])
///     .build()
///     .unwrap();
///
/// logger.info("started", &[]);
/// logger.sync().unwrap();
/// assert_eq!(out.lines(), vec![r#"{"level":"info","msg":"started","service":"billing"}"#]);
/// ```
pub struct LoggerBuilder {
    level: LogLevel,
    destination: Option<Destination>,
    async_mode: bool,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
    config: LoggerConfig,
    loose: Vec<Value<'static>>,
    typed: Vec<Field<'static>>,
    sampler: Option<Sampler>,
    registry: Option<Arc<WorkerRegistry>>,
    diagnostics: Arc<dyn DiagnosticSink>,
    worker_name: String,
    process_info: bool,
}

impl LoggerBuilder {
    /// Builder with the defaults listed above.
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            destination: None,
            async_mode: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::Sync,
            config: LoggerConfig::default(),
            loose: Vec::new(),
            typed: Vec::new(),
            sampler: None,
            registry: None,
            diagnostics: Arc::new(StderrSink),
            worker_name: WorkerOptions::default().name,
            process_info: false,
        }
    }

    /// Start from declarative options.
    pub fn from_options(options: &LoggerOptions) -> Self {
        Self::new()
            .level(options.level)
            .queue_capacity(options.buffer_size)
            .overflow_policy(options.overflow_policy)
            .async_mode(options.async_mode)
            .report_timestamp(options.report_timestamp)
            .time_format(options.time_format.clone())
            .report_caller(options.report_caller)
            .caller_offset(options.caller_offset)
            .report_stacktrace(options.report_stacktrace)
            .prefix(options.prefix.clone())
            .formatter(options.formatter)
    }

    /// Minimum level.
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Destination of encoded records. Defaults to stderr.
    #[must_use = "builder methods return a new value"]
    pub fn output<W: Write + Send + 'static>(mut self, output: W) -> Self {
        self.destination = Some(Box::new(output));
        self
    }

    /// Deliver through a background worker thread.
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, enabled: bool) -> Self {
        self.async_mode = enabled;
        self
    }

    /// Queue slots for async delivery.
    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// What to do when the async queue is full.
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Prefix written before the message.
    #[must_use = "builder methods return a new value"]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Write a timestamp on every record.
    #[must_use = "builder methods return a new value"]
    pub fn report_timestamp(mut self, report: bool) -> Self {
        self.config.report_timestamp = report;
        self
    }

    /// Timestamp rendering.
    #[must_use = "builder methods return a new value"]
    pub fn time_format(mut self, format: TimestampFormat) -> Self {
        self.config.time_format = format;
        self
    }

    /// Clock used for timestamps and sampling windows.
    #[must_use = "builder methods return a new value"]
    pub fn time_source(mut self, source: TimeSource) -> Self {
        self.config.time_source = source;
        self
    }

    /// Text or JSON output.
    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, formatter: OutputFormat) -> Self {
        self.config.formatter = formatter;
        self
    }

    /// Write the caller location on every record.
    #[must_use = "builder methods return a new value"]
    pub fn report_caller(mut self, report: bool) -> Self {
        self.config.report_caller = report;
        self
    }

    /// Frames to skip above the logging call.
    #[must_use = "builder methods return a new value"]
    pub fn caller_offset(mut self, offset: usize) -> Self {
        self.config.caller_offset = offset;
        self
    }

    /// How the caller is rendered.
    #[must_use = "builder methods return a new value"]
    pub fn caller_formatter(mut self, formatter: CallerFormatter) -> Self {
        self.config.caller_formatter = formatter;
        self
    }

    /// Capture stack frames for error-level records and records with error values.
    #[must_use = "builder methods return a new value"]
    pub fn report_stacktrace(mut self, report: bool) -> Self {
        self.config.report_stacktrace = report;
        self
    }

    /// How fields are pulled from a context value.
    #[must_use = "builder methods return a new value"]
    pub fn context_extractor(mut self, extractor: ContextExtractor) -> Self {
        self.config.context_extractor = Some(extractor);
        self
    }

    /// Text formatter styles.
    #[must_use = "builder methods return a new value"]
    pub fn styles(mut self, styles: Styles) -> Self {
        self.config.styles = styles;
        self
    }

    /// Attach typed fields to every record.
    #[must_use = "builder methods return a new value"]
    pub fn fields(mut self, fields: Vec<Field<'static>>) -> Self {
        self.typed.extend(fields);
        self
    }

    /// Attach loose key/value pairs to every record.
    #[must_use = "builder methods return a new value"]
    pub fn keyvals(mut self, keyvals: Vec<Value<'static>>) -> Self {
        self.loose.extend(keyvals);
        self
    }

    /// Thin out repeated messages.
    #[must_use = "builder methods return a new value"]
    pub fn sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Registry the async worker joins. Defaults to [`WorkerRegistry::global`].
    #[must_use = "builder methods return a new value"]
    pub fn registry(mut self, registry: Arc<WorkerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Where write and flush failures are reported. Defaults to stderr.
    #[must_use = "builder methods return a new value"]
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Name of the worker thread.
    #[must_use = "builder methods return a new value"]
    pub fn worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    /// Attach `hostname` and `pid` fields.
    #[must_use = "builder methods return a new value"]
    pub fn process_info(mut self, enabled: bool) -> Self {
        self.process_info = enabled;
        self
    }

    /// Build the logger, spawning its worker when async.
    pub fn build(self) -> Result<Logger> {
        if self.async_mode && self.queue_capacity == 0 {
            return Err(LoggerError::config(
                "queue_capacity",
                "async delivery needs a queue capacity of at least 1",
            ));
        }

        let registry = self.registry.unwrap_or_else(WorkerRegistry::global);
        let destination = self.destination.unwrap_or_else(output::stderr);
        let sink = if self.async_mode {
            let worker = Worker::spawn(
                destination,
                WorkerOptions {
                    name: self.worker_name,
                    capacity: self.queue_capacity,
                    policy: self.overflow_policy,
                    diagnostics: Arc::clone(&self.diagnostics),
                },
            )?;
            registry.register(Arc::clone(&worker));
            Sink::Async(worker)
        } else {
            Sink::Direct(Arc::new(DirectWriter::new(
                destination,
                Arc::clone(&self.diagnostics),
            )))
        };

        let mut typed = self.typed;
        if self.process_info {
            typed.push(Field::string("hostname", hostname()));
            typed.push(Field::uint("pid", u64::from(std::process::id())));
        }
        let mut loose = self.loose;
        loose.truncate(loose.len() & !1);
        let fields = AttachedFields::new(loose, typed, &self.config);

        Ok(Logger {
            config: ArcSwap::from_pointee(self.config),
            level: AtomicLevel::new(self.level),
            fields: Arc::new(fields),
            sink,
            sampler: self.sampler.map(Arc::new),
            registry,
            diagnostics: self.diagnostics,
            closed: AtomicBool::new(false),
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Host name as reported by the OS.
#[cfg(unix)]
fn hostname() -> String {
    let mut name = [0u8; 256];
    let rc = unsafe { libc::gethostname(name.as_mut_ptr().cast(), name.len()) };
    if rc != 0 {
        return "unknown".to_string();
    }
    let len = name.iter().position(|&b| b == 0).unwrap_or(name.len());
    match String::from_utf8_lossy(&name[..len]) {
        host if host.is_empty() => "unknown".to_string(),
        host => host.into_owned(),
    }
}

#[cfg(not(unix))]
fn hostname() -> String {
    std::env::var("COMPUTERNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
