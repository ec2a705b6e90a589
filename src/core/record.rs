//! Record model shared by the fast and slow encoding paths
//!
//! The fast path encodes straight from a [`Header`] and a [`FieldSet`]. The
//! slow path wraps the same data in a [`Record`] together with the caller and
//! stack frames, whose owned storage comes from a pooled [`RecordScratch`].

use crate::core::buffer::{Buffer, Pool, Pooled, Recycle};
use crate::core::field::{Field, Value};
use crate::core::log_level::LogLevel;
use crate::core::output_format::OutputFormat;
use crate::core::timestamp::TimestampFormat;
use crate::format::{self, json, Styles};
use chrono::{DateTime, Utc};
use std::sync::OnceLock;

/// Top-level attributes of one event.
#[derive(Debug, Clone, Copy)]
pub struct Header<'a> {
    pub time: Option<DateTime<Utc>>,
    pub level: LogLevel,
    pub prefix: &'a str,
    pub message: &'a str,
    pub time_format: &'a TimestampFormat,
}

/// The five field groups of one event, in output order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSet<'a> {
    pub logger_loose: &'a [Value<'a>],
    pub call_loose: &'a [Value<'a>],
    pub logger_typed: &'a [Field<'a>],
    pub context_typed: &'a [Field<'a>],
    pub call_typed: &'a [Field<'a>],
}

impl FieldSet<'_> {
    /// Whether any value in the set is an error.
    pub fn has_error(&self) -> bool {
        let loose = |values: &[Value<'_>]| {
            values
                .chunks_exact(2)
                .any(|pair| matches!(pair[1], Value::Error(_)))
        };
        let typed = |fields: &[Field<'_>]| {
            fields
                .iter()
                .any(|field| matches!(field.value(), Value::Error(_)))
        };
        loose(self.logger_loose)
            || loose(self.call_loose)
            || typed(self.logger_typed)
            || typed(self.context_typed)
            || typed(self.call_typed)
    }
}

/// Logger-attached fields serialized once as JSON.
///
/// Each fragment is a run of `,"key":value` members, kept separately for the
/// loose and typed groups so call-site loose fields can be spliced between
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreEncoded {
    pub loose: Vec<u8>,
    pub typed: Vec<u8>,
}

impl PreEncoded {
    /// Encode attached fields once, as JSON members with leading commas.
    pub fn build(
        loose: &[Value<'_>],
        typed: &[Field<'_>],
        time_format: &TimestampFormat,
    ) -> Self {
        let mut first = false;
        let mut buf = Buffer::default();
        json::write_loose(&mut buf, loose, time_format, &mut first);
        let loose = buf.as_bytes().to_vec();

        buf.clear();
        first = false;
        json::write_typed(&mut buf, typed, time_format, &mut first);
        Self {
            loose,
            typed: buf.as_bytes().to_vec(),
        }
    }
}

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

/// Pooled owned storage for the slow path.
#[derive(Debug, Default)]
pub struct RecordScratch {
    pub caller: String,
    pub stack: Vec<StackFrame>,
}

impl RecordScratch {
    /// Take cleared scratch space from the pool.
    pub fn acquire() -> Pooled<RecordScratch> {
        scratch_pool().acquire()
    }
}

impl Recycle for RecordScratch {
    fn fresh() -> Self {
        Self {
            caller: String::with_capacity(64),
            stack: Vec::with_capacity(crate::core::stack::MAX_STACK_FRAMES),
        }
    }

    fn reset(&mut self) {
        self.caller.clear();
        self.stack.clear();
    }
}

fn scratch_pool() -> &'static Pool<RecordScratch> {
    static POOL: OnceLock<Pool<RecordScratch>> = OnceLock::new();
    POOL.get_or_init(|| Pool::new(256))
}

/// Slow-path view of one event.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub header: Header<'a>,
    pub caller: &'a str,
    pub stack: &'a [StackFrame],
    pub pre_encoded: Option<&'a PreEncoded>,
    pub formatter: OutputFormat,
    pub fields: FieldSet<'a>,
}

impl Record<'_> {
    /// Encode the record into `buf` with the configured formatter.
    pub fn encode(&self, buf: &mut Buffer, styles: &Styles) {
        format::encode_record(buf, self, styles);
    }
}
