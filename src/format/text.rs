//! Human-readable text encoder
//!
//! `[TIME ][LEVEL ][<caller> ][prefix: ]message[ key=value]*`, one line per
//! record, followed by stack frames when a trace was captured.

use crate::core::buffer::Buffer;
use crate::core::encoder::JsonEncoder;
use crate::core::field::{Field, Value};
use crate::core::record::{FieldSet, Header, Record, StackFrame};
use crate::core::timestamp::{append_time, TimestampFormat};
use crate::format::json;
use crate::format::style::Styles;
use std::fmt::Write as _;

/// Render a value as unquoted text.
///
/// Nested objects, arrays and lists are rendered as JSON.
pub fn append_value(buf: &mut Buffer, value: &Value<'_>, time_format: &TimestampFormat) {
    match value {
        Value::Str(s) => buf.push_str(s),
        Value::Int(v) => buf.push_i64(*v),
        Value::Uint(v) => buf.push_u64(*v),
        Value::Float(v) => buf.push_f64(*v),
        Value::Bool(v) => buf.push_bool(*v),
        Value::Error(err) => {
            let _ = write!(buf, "{}", &**err);
        }
        Value::Time(t) => append_time(buf, *t, time_format),
        Value::Duration(d) => {
            let _ = write!(buf, "{:?}", d);
        }
        Value::Any(v) => {
            let _ = write!(buf, "{:?}", &**v);
        }
        Value::Object(v) => {
            let _ = JsonEncoder::encode_object(buf, &**v);
        }
        Value::Array(v) => {
            let _ = JsonEncoder::encode_array(buf, &**v);
        }
        Value::Ints(_) | Value::Strs(_) | Value::Times(_) => {
            json::append_value(buf, value, time_format)
        }
    }
}

/// `key=value`, quoting the value iff it contains a space or `=`.
fn write_value(
    buf: &mut Buffer,
    value: &Value<'_>,
    time_format: &TimestampFormat,
    styles: &Styles,
) {
    styles.separator.paint(buf, "=");
    let start = buf.len();
    append_value(buf, value, time_format);
    let quote = buf
        .since(start)
        .iter()
        .any(|&b| b == b' ' || b == b'=');
    styles.value.wrap(buf, start);
    if quote {
        buf.insert_bytes(start, b"\"");
        buf.push(b'"');
    }
}

fn write_loose(
    buf: &mut Buffer,
    values: &[Value<'_>],
    time_format: &TimestampFormat,
    styles: &Styles,
) {
    for pair in values.chunks_exact(2) {
        let mark = buf.len();
        buf.push(b' ');
        let key_start = buf.len();
        append_value(buf, &pair[0], time_format);
        if buf.len() == key_start {
            buf.truncate(mark);
            continue;
        }
        styles.key.wrap(buf, key_start);
        write_value(buf, &pair[1], time_format, styles);
    }
}

fn write_typed(
    buf: &mut Buffer,
    fields: &[Field<'_>],
    time_format: &TimestampFormat,
    styles: &Styles,
) {
    for field in fields {
        if field.key().is_empty() {
            continue;
        }
        buf.push(b' ');
        styles.key.paint(buf, field.key());
        write_value(buf, field.value(), time_format, styles);
    }
}

fn write_time_level(buf: &mut Buffer, header: &Header<'_>, styles: &Styles) {
    if let Some(t) = header.time {
        let start = buf.len();
        append_time(buf, t, header.time_format);
        styles.timestamp.wrap(buf, start);
        buf.push(b' ');
    }
    if header.level.is_labelled() {
        styles.level(header.level).paint(buf, header.level.label());
        buf.push(b' ');
    }
}

fn write_prefix_message(buf: &mut Buffer, header: &Header<'_>, styles: &Styles) {
    if !header.prefix.is_empty() {
        let start = buf.len();
        buf.push_str(header.prefix);
        buf.push(b':');
        styles.prefix.wrap(buf, start);
        buf.push(b' ');
    }
    if !header.message.is_empty() {
        styles.message.paint(buf, header.message);
    }
}

fn write_fields(buf: &mut Buffer, fields: &FieldSet<'_>, tf: &TimestampFormat, styles: &Styles) {
    write_loose(buf, fields.logger_loose, tf, styles);
    write_loose(buf, fields.call_loose, tf, styles);
    write_typed(buf, fields.logger_typed, tf, styles);
    write_typed(buf, fields.context_typed, tf, styles);
    write_typed(buf, fields.call_typed, tf, styles);
}

fn write_stack(buf: &mut Buffer, stack: &[StackFrame], styles: &Styles) {
    for frame in stack {
        buf.push(b'\n');
        styles.separator.paint(buf, "   at ");
        buf.push_str(&frame.function);
        buf.push(b' ');
        buf.push_str(&frame.file);
        buf.push(b':');
        buf.push_u64(u64::from(frame.line));
    }
}

/// Fast path: encode directly from call arguments.
pub fn encode(buf: &mut Buffer, header: &Header<'_>, fields: &FieldSet<'_>, styles: &Styles) {
    write_time_level(buf, header, styles);
    write_prefix_message(buf, header, styles);
    write_fields(buf, fields, header.time_format, styles);
    buf.push(b'\n');
}

/// Slow path: encode a populated record, including caller and stack.
pub fn encode_record(buf: &mut Buffer, record: &Record<'_>, styles: &Styles) {
    let header = &record.header;
    write_time_level(buf, header, styles);
    if !record.caller.is_empty() {
        let start = buf.len();
        buf.push(b'<');
        buf.push_str(record.caller);
        buf.push(b'>');
        styles.caller.wrap(buf, start);
        buf.push(b' ');
    }
    write_prefix_message(buf, header, styles);
    write_fields(buf, &record.fields, header.time_format, styles);
    write_stack(buf, record.stack, styles);
    buf.push(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use crate::core::output_format::OutputFormat;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn line(buf: &Buffer) -> &str {
        std::str::from_utf8(buf.as_bytes()).unwrap()
    }

    fn bare(format: &TimestampFormat) -> Header<'_> {
        Header {
            time: None,
            level: LogLevel::Info,
            prefix: "",
            message: "msg",
            time_format: format,
        }
    }

    #[test]
    fn test_value_quoted_only_with_space_or_equals() {
        let format = TimestampFormat::Default;
        let typed = [
            Field::string("path", "/a b"),
            Field::string("plain", "/a"),
            Field::string("expr", "x=1"),
            Field::string("quote", "say\"hi"),
        ];
        let fields = FieldSet {
            call_typed: &typed,
            ..FieldSet::default()
        };
        let mut buf = Buffer::default();
        encode(&mut buf, &bare(&format), &fields, &Styles::plain());
        assert_eq!(
            line(&buf),
            "INFO msg path=\"/a b\" plain=/a expr=\"x=1\" quote=say\"hi\n"
        );
    }

    #[test]
    fn test_full_header_layout() {
        let format = TimestampFormat::Default;
        let header = Header {
            time: Some(Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap()),
            level: LogLevel::Warn,
            prefix: "db",
            message: "slow query",
            time_format: &format,
        };
        let typed = [Field::duration("took", Duration::from_millis(1500))];
        let record = Record {
            header,
            caller: "store.rs:88",
            stack: &[],
            pre_encoded: None,
            formatter: OutputFormat::Text,
            fields: FieldSet {
                call_typed: &typed,
                ..FieldSet::default()
            },
        };
        let mut buf = Buffer::default();
        encode_record(&mut buf, &record, &Styles::plain());
        assert_eq!(
            line(&buf),
            "2025/01/08 10:30:45 WARN <store.rs:88> db: slow query took=1.5s\n"
        );
    }

    #[test]
    fn test_print_level_has_no_label() {
        let format = TimestampFormat::Default;
        let header = Header {
            level: LogLevel::Print,
            ..bare(&format)
        };
        let mut buf = Buffer::default();
        encode(&mut buf, &header, &FieldSet::default(), &Styles::plain());
        assert_eq!(line(&buf), "msg\n");
    }

    #[test]
    fn test_loose_pairs_skip_empty_keys_and_odd_tail() {
        let format = TimestampFormat::Default;
        let loose = [
            Value::from("a"),
            Value::from(1),
            Value::from(""),
            Value::from("hidden"),
            Value::from("b"),
            Value::from(true),
            Value::from("orphan"),
        ];
        let fields = FieldSet {
            call_loose: &loose,
            ..FieldSet::default()
        };
        let mut buf = Buffer::default();
        encode(&mut buf, &bare(&format), &fields, &Styles::plain());
        assert_eq!(line(&buf), "INFO msg a=1 b=true\n");
    }

    #[test]
    fn test_lists_render_as_json() {
        let format = TimestampFormat::Default;
        let ids = [1_i64, 2, 3];
        let names = ["x", "y z"];
        let typed = [Field::ints("ids", &ids), Field::strs("names", &names)];
        let fields = FieldSet {
            call_typed: &typed,
            ..FieldSet::default()
        };
        let mut buf = Buffer::default();
        encode(&mut buf, &bare(&format), &fields, &Styles::plain());
        assert_eq!(
            line(&buf),
            "INFO msg ids=[1,2,3] names=\"[\"x\",\"y z\"]\"\n"
        );
    }

    #[test]
    fn test_stack_frames_follow_line() {
        let format = TimestampFormat::Default;
        let stack = [
            StackFrame {
                function: "handle".into(),
                file: "api.rs".into(),
                line: 12,
            },
            StackFrame {
                function: "main".into(),
                file: "main.rs".into(),
                line: 3,
            },
        ];
        let record = Record {
            header: Header {
                level: LogLevel::Error,
                ..bare(&format)
            },
            caller: "",
            stack: &stack,
            pre_encoded: None,
            formatter: OutputFormat::Text,
            fields: FieldSet::default(),
        };
        let mut buf = Buffer::default();
        encode_record(&mut buf, &record, &Styles::plain());
        assert_eq!(
            line(&buf),
            "ERRO msg\n   at handle api.rs:12\n   at main main.rs:3\n"
        );
    }

    #[test]
    fn test_fast_and_slow_paths_agree() {
        let format = TimestampFormat::Rfc3339;
        let loose = [Value::from("k"), Value::from("v v")];
        let typed = [Field::float("ratio", 0.5)];
        let fields = FieldSet {
            logger_loose: &loose,
            call_typed: &typed,
            ..FieldSet::default()
        };
        let header = Header {
            time: Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()),
            prefix: "svc",
            ..bare(&format)
        };
        let record = Record {
            header,
            caller: "",
            stack: &[],
            pre_encoded: None,
            formatter: OutputFormat::Text,
            fields,
        };

        let mut fast = Buffer::default();
        encode(&mut fast, &header, &fields, &Styles::plain());
        let mut slow = Buffer::default();
        encode_record(&mut slow, &record, &Styles::plain());
        assert_eq!(fast.as_bytes(), slow.as_bytes());
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_color_does_not_change_quoting() {
        let format = TimestampFormat::Default;
        let typed = [Field::string("path", "/a b")];
        let fields = FieldSet {
            call_typed: &typed,
            ..FieldSet::default()
        };
        let mut buf = Buffer::default();
        encode(&mut buf, &bare(&format), &fields, &Styles::colored());
        let text = line(&buf);
        assert!(text.contains("\"/a b\""));
    }
}
