//! Zero-allocation JSON encoder
//!
//! Records are written member by member into the pooled buffer; no
//! intermediate map or `serde` value is built on the logging path.

use crate::core::buffer::Buffer;
use crate::core::encoder::JsonEncoder;
use crate::core::field::{Field, Value};
use crate::core::record::{FieldSet, Header, PreEncoded, Record, StackFrame};
use crate::core::timestamp::{append_time, TimestampFormat};
use crate::format::text;
use std::fmt::{self, Write as _};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Bytes that may be copied into a JSON string verbatim.
static NO_ESCAPE: [bool; 256] = no_escape_table();

const fn no_escape_table() -> [bool; 256] {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i >= 0x20 && i != b'"' as usize && i != b'\\' as usize;
        i += 1;
    }
    table
}

/// Append `s` without surrounding quotes, escaping as needed.
///
/// Runs of bytes that need no escaping are copied in one slice.
pub fn append_escaped(buf: &mut Buffer, s: &str) {
    append_escaped_bytes(buf, s.as_bytes());
}

fn append_escaped_bytes(buf: &mut Buffer, bytes: &[u8]) {
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if NO_ESCAPE[b as usize] {
            continue;
        }
        buf.extend_from_slice(&bytes[start..i]);
        match b {
            b'"' => buf.push_str("\\\""),
            b'\\' => buf.push_str("\\\\"),
            b'\n' => buf.push_str("\\n"),
            b'\r' => buf.push_str("\\r"),
            b'\t' => buf.push_str("\\t"),
            0x08 => buf.push_str("\\b"),
            0x0c => buf.push_str("\\f"),
            _ => {
                buf.push_str("\\u00");
                buf.push(HEX[(b >> 4) as usize]);
                buf.push(HEX[(b & 0x0f) as usize]);
            }
        }
        start = i + 1;
    }
    buf.extend_from_slice(&bytes[start..]);
}

/// Append `s` as a quoted JSON string.
pub fn append_string(buf: &mut Buffer, s: &str) {
    buf.push(b'"');
    append_escaped(buf, s);
    buf.push(b'"');
}

/// Append `"key":`, preceded by a comma when `comma` is set.
pub fn append_key(buf: &mut Buffer, key: &str, comma: bool) {
    if comma {
        buf.push(b',');
    }
    append_string(buf, key);
    buf.push(b':');
}

/// Non-finite values have no JSON representation and become `null`.
pub fn append_f64(buf: &mut Buffer, value: f64) {
    if value.is_finite() {
        buf.push_f64(value);
    } else {
        buf.push_str("null");
    }
}

/// Numeric layouts are bare numbers, everything else is a string.
pub fn append_time_value(
    buf: &mut Buffer,
    t: chrono::DateTime<chrono::Utc>,
    format: &TimestampFormat,
) {
    match format {
        TimestampFormat::Unix | TimestampFormat::UnixMilli => append_time(buf, t, format),
        TimestampFormat::Custom(layout) => {
            buf.push(b'"');
            let _ = write!(Escaper(buf), "{}", t.format(layout));
            buf.push(b'"');
        }
        _ => {
            buf.push(b'"');
            append_time(buf, t, format);
            buf.push(b'"');
        }
    }
}

/// `fmt::Write` adapter that escapes everything written through it.
struct Escaper<'b>(&'b mut Buffer);

impl fmt::Write for Escaper<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        append_escaped(self.0, s);
        Ok(())
    }
}

/// Append one value in JSON form.
pub fn append_value(buf: &mut Buffer, value: &Value<'_>, time_format: &TimestampFormat) {
    match value {
        Value::Str(s) => append_string(buf, s),
        Value::Int(v) => buf.push_i64(*v),
        Value::Uint(v) => buf.push_u64(*v),
        Value::Float(v) => append_f64(buf, *v),
        Value::Bool(v) => buf.push_bool(*v),
        Value::Error(err) => {
            buf.push(b'"');
            let _ = write!(Escaper(buf), "{}", &**err);
            buf.push(b'"');
        }
        Value::Time(t) => append_time_value(buf, *t, time_format),
        Value::Duration(d) => buf.push_u128(d.as_nanos()),
        Value::Any(v) => {
            buf.push(b'"');
            let _ = write!(Escaper(buf), "{:?}", &**v);
            buf.push(b'"');
        }
        Value::Object(v) => {
            // A failing marshaler still leaves a closed object behind.
            let _ = JsonEncoder::encode_object(buf, &**v);
        }
        Value::Array(v) => {
            let _ = JsonEncoder::encode_array(buf, &**v);
        }
        Value::Ints(values) => {
            buf.push(b'[');
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                buf.push_i64(*v);
            }
            buf.push(b']');
        }
        Value::Strs(values) => {
            buf.push(b'[');
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                append_string(buf, v);
            }
            buf.push(b']');
        }
        Value::Times(values) => {
            buf.push(b'[');
            for (i, t) in values.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                append_time_value(buf, *t, time_format);
            }
            buf.push(b']');
        }
    }
}

/// Loose pairs, two values at a time. Returns silently on an odd tail.
pub(crate) fn write_loose(
    buf: &mut Buffer,
    values: &[Value<'_>],
    time_format: &TimestampFormat,
    first: &mut bool,
) {
    for pair in values.chunks_exact(2) {
        let written = match &pair[0] {
            Value::Str(key) if key.is_empty() => false,
            Value::Str(key) => {
                append_key(buf, key, !*first);
                true
            }
            other => append_rendered_key(buf, other, time_format, !*first),
        };
        if written {
            append_value(buf, &pair[1], time_format);
            *first = false;
        }
    }
}

/// Render a non-string key in its text form straight into `buf`.
///
/// Leaves `buf` untouched and returns false when the key renders empty.
fn append_rendered_key(
    buf: &mut Buffer,
    key: &Value<'_>,
    time_format: &TimestampFormat,
    comma: bool,
) -> bool {
    let start = buf.len();
    if comma {
        buf.push(b',');
    }
    buf.push(b'"');
    let key_start = buf.len();
    text::append_value(buf, key, time_format);
    if buf.len() == key_start {
        buf.truncate(start);
        return false;
    }
    if !buf.since(key_start).iter().all(|&b| NO_ESCAPE[b as usize]) {
        let mut raw = Buffer::acquire();
        raw.extend_from_slice(buf.since(key_start));
        buf.truncate(key_start);
        append_escaped_bytes(buf, raw.as_bytes());
    }
    buf.push_str("\":");
    true
}

pub(crate) fn write_typed(
    buf: &mut Buffer,
    fields: &[Field<'_>],
    time_format: &TimestampFormat,
    first: &mut bool,
) {
    for field in fields {
        if field.key().is_empty() {
            continue;
        }
        append_key(buf, field.key(), !*first);
        append_value(buf, field.value(), time_format);
        *first = false;
    }
}

fn splice(buf: &mut Buffer, fragment: &[u8], first: &mut bool) {
    if fragment.is_empty() {
        return;
    }
    if *first {
        buf.extend_from_slice(&fragment[1..]);
    } else {
        buf.extend_from_slice(fragment);
    }
    *first = false;
}

fn write_time_level(buf: &mut Buffer, header: &Header<'_>, first: &mut bool) {
    buf.push(b'{');
    if let Some(t) = header.time {
        buf.push_str("\"time\":");
        append_time_value(buf, t, header.time_format);
        *first = false;
    }
    if header.level.is_labelled() {
        append_key(buf, "level", !*first);
        append_string(buf, header.level.to_str());
        *first = false;
    }
}

fn write_member(buf: &mut Buffer, key: &str, value: &str, first: &mut bool) {
    if value.is_empty() {
        return;
    }
    append_key(buf, key, !*first);
    append_string(buf, value);
    *first = false;
}

fn write_fields(
    buf: &mut Buffer,
    fields: &FieldSet<'_>,
    pre_encoded: Option<&PreEncoded>,
    time_format: &TimestampFormat,
    first: &mut bool,
) {
    match pre_encoded {
        Some(pre) => splice(buf, &pre.loose, first),
        None => write_loose(buf, fields.logger_loose, time_format, first),
    }
    write_loose(buf, fields.call_loose, time_format, first);
    match pre_encoded {
        Some(pre) => splice(buf, &pre.typed, first),
        None => write_typed(buf, fields.logger_typed, time_format, first),
    }
    write_typed(buf, fields.context_typed, time_format, first);
    write_typed(buf, fields.call_typed, time_format, first);
}

fn write_stack(buf: &mut Buffer, stack: &[StackFrame], first: &mut bool) {
    if stack.is_empty() {
        return;
    }
    append_key(buf, "stacktrace", !*first);
    buf.push(b'[');
    for (i, frame) in stack.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        buf.push(b'"');
        append_escaped(buf, &frame.function);
        buf.push(b' ');
        append_escaped(buf, &frame.file);
        buf.push(b':');
        buf.push_u64(u64::from(frame.line));
        buf.push(b'"');
    }
    buf.push(b']');
    *first = false;
}

/// Fast path: encode directly from call arguments.
pub fn encode(
    buf: &mut Buffer,
    header: &Header<'_>,
    fields: &FieldSet<'_>,
    pre_encoded: Option<&PreEncoded>,
) {
    let mut first = true;
    write_time_level(buf, header, &mut first);
    write_member(buf, "prefix", header.prefix, &mut first);
    write_member(buf, "msg", header.message, &mut first);
    write_fields(buf, fields, pre_encoded, header.time_format, &mut first);
    buf.push_str("}\n");
}

/// Slow path: encode a populated record, including caller and stack.
pub fn encode_record(buf: &mut Buffer, record: &Record<'_>) {
    let header = &record.header;
    let mut first = true;
    write_time_level(buf, header, &mut first);
    write_member(buf, "caller", record.caller, &mut first);
    write_member(buf, "prefix", header.prefix, &mut first);
    write_member(buf, "msg", header.message, &mut first);
    write_fields(
        buf,
        &record.fields,
        record.pre_encoded,
        header.time_format,
        &mut first,
    );
    write_stack(buf, record.stack, &mut first);
    buf.push_str("}\n");
}
