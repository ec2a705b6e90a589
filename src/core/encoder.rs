//! Visitor contract for nested structured values
//!
//! User types implement [`ObjectMarshaler`] or [`ArrayMarshaler`] and drive
//! calls against an [`ObjectEncoder`] / [`ArrayEncoder`]. The encoder writes
//! straight into the record's buffer, so nested values need neither reflection
//! nor an intermediate container.
//!
//! # Example
//!
//! ```
//! use rust_fast_logger::{ObjectEncoder, ObjectMarshaler, Result};
//!
//! struct User {
//!     name: String,
//!     age: i64,
//! }
//!
//! impl ObjectMarshaler for User {
//!     fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
//!         enc.add_str("name", &self.name);
//!         enc.add_i64("age", self.age);
//!         Ok(())
//!     }
//! }
//! ```

use crate::core::buffer::Buffer;
use crate::core::error::Result;
use crate::core::timestamp::{append_time, TimestampFormat};
use crate::format::json;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Keyed sink for the members of a nested object.
pub trait ObjectEncoder {
    fn add_str(&mut self, key: &str, value: &str);
    fn add_i64(&mut self, key: &str, value: i64);
    fn add_u64(&mut self, key: &str, value: u64);
    fn add_f64(&mut self, key: &str, value: f64);
    fn add_bool(&mut self, key: &str, value: bool);
    fn add_time(&mut self, key: &str, value: DateTime<Utc>);
    fn add_duration(&mut self, key: &str, value: Duration);
    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()>;
    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()>;
}

/// Positional sink for the elements of a nested array.
pub trait ArrayEncoder {
    fn append_str(&mut self, value: &str);
    fn append_i64(&mut self, value: i64);
    fn append_u64(&mut self, value: u64);
    fn append_f64(&mut self, value: f64);
    fn append_bool(&mut self, value: bool);
    fn append_time(&mut self, value: DateTime<Utc>);
    fn append_duration(&mut self, value: Duration);
    fn append_object(&mut self, value: &dyn ObjectMarshaler) -> Result<()>;
    fn append_array(&mut self, value: &dyn ArrayMarshaler) -> Result<()>;
}

/// A value that can log itself as a JSON object.
pub trait ObjectMarshaler: Send + Sync {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()>;
}

/// A value that can log itself as a JSON array.
pub trait ArrayMarshaler: Send + Sync {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()>;
}

/// JSON implementation of both encoder traits.
///
/// Members are separated by tracking whether the next write is the first one
/// in the enclosing object or array.
pub struct JsonEncoder<'b> {
    buf: &'b mut Buffer,
    first: bool,
}

impl<'b> JsonEncoder<'b> {
    /// Encoder appending members to `buf`.
    pub fn new(buf: &'b mut Buffer) -> Self {
        Self { buf, first: true }
    }

    /// Write `{...}` for `value` into `buf`.
    pub fn encode_object(buf: &mut Buffer, value: &dyn ObjectMarshaler) -> Result<()> {
        buf.push(b'{');
        let result = value.marshal_log_object(&mut JsonEncoder::new(buf));
        buf.push(b'}');
        result
    }

    /// Write `[...]` for `value` into `buf`.
    pub fn encode_array(buf: &mut Buffer, value: &dyn ArrayMarshaler) -> Result<()> {
        buf.push(b'[');
        let result = value.marshal_log_array(&mut JsonEncoder::new(buf));
        buf.push(b']');
        result
    }

    fn key(&mut self, key: &str) {
        json::append_key(self.buf, key, !self.first);
        self.first = false;
    }

    fn separator(&mut self) {
        if !self.first {
            self.buf.push(b',');
        }
        self.first = false;
    }

    fn time(&mut self, value: DateTime<Utc>) {
        self.buf.push(b'"');
        append_time(self.buf, value, &TimestampFormat::Rfc3339Nano);
        self.buf.push(b'"');
    }
}

impl ObjectEncoder for JsonEncoder<'_> {
    fn add_str(&mut self, key: &str, value: &str) {
        self.key(key);
        json::append_string(self.buf, value);
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.key(key);
        self.buf.push_i64(value);
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.key(key);
        self.buf.push_u64(value);
    }

    fn add_f64(&mut self, key: &str, value: f64) {
        self.key(key);
        json::append_f64(self.buf, value);
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.key(key);
        self.buf.push_bool(value);
    }

    fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
        self.key(key);
        self.time(value);
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.key(key);
        self.buf.push_u128(value.as_nanos());
    }

    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()> {
        self.key(key);
        JsonEncoder::encode_object(self.buf, value)
    }

    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()> {
        self.key(key);
        JsonEncoder::encode_array(self.buf, value)
    }
}

impl ArrayEncoder for JsonEncoder<'_> {
    fn append_str(&mut self, value: &str) {
        self.separator();
        json::append_string(self.buf, value);
    }

    fn append_i64(&mut self, value: i64) {
        self.separator();
        self.buf.push_i64(value);
    }

    fn append_u64(&mut self, value: u64) {
        self.separator();
        self.buf.push_u64(value);
    }

    fn append_f64(&mut self, value: f64) {
        self.separator();
        json::append_f64(self.buf, value);
    }

    fn append_bool(&mut self, value: bool) {
        self.separator();
        self.buf.push_bool(value);
    }

    fn append_time(&mut self, value: DateTime<Utc>) {
        self.separator();
        self.time(value);
    }

    fn append_duration(&mut self, value: Duration) {
        self.separator();
        self.buf.push_u128(value.as_nanos());
    }

    fn append_object(&mut self, value: &dyn ObjectMarshaler) -> Result<()> {
        self.separator();
        JsonEncoder::encode_object(self.buf, value)
    }

    fn append_array(&mut self, value: &dyn ArrayMarshaler) -> Result<()> {
        self.separator();
        JsonEncoder::encode_array(self.buf, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LoggerError;
    use chrono::TimeZone;

    struct Point {
        x: i64,
        y: f64,
    }

    impl ObjectMarshaler for Point {
        fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
            enc.add_i64("x", self.x);
            enc.add_f64("y", self.y);
            Ok(())
        }
    }

    struct Path(Vec<Point>);

    impl ArrayMarshaler for Path {
        fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
            for point in &self.0 {
                enc.append_object(point)?;
            }
            Ok(())
        }
    }

    struct Route {
        name: &'static str,
        path: Path,
    }

    impl ObjectMarshaler for Route {
        fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
            enc.add_str("name", self.name);
            enc.add_array("path", &self.path)?;
            enc.add_bool("open", true);
            enc.add_duration("eta", Duration::from_millis(3));
            Ok(())
        }
    }

    struct Failing;

    impl ObjectMarshaler for Failing {
        fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
            enc.add_str("partial", "yes");
            Err(LoggerError::other("marshal failed"))
        }
    }

    #[test]
    fn test_nested_object_and_array() {
        let route = Route {
            name: "north \"loop\"",
            path: Path(vec![Point { x: 1, y: 2.5 }, Point { x: -3, y: f64::NAN }]),
        };
        let mut buf = Buffer::default();
        JsonEncoder::encode_object(&mut buf, &route).unwrap();

        let text = std::str::from_utf8(buf.as_bytes()).unwrap();
        assert_eq!(
            text,
            r#"{"name":"north \"loop\"","path":[{"x":1,"y":2.5},{"x":-3,"y":null}],"open":true,"eta":3000000}"#
        );
        let parsed: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed["path"][1]["y"], serde_json::Value::Null);
    }

    #[test]
    fn test_time_members_use_rfc3339_nano() {
        struct Stamp;
        impl ObjectMarshaler for Stamp {
            fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
                let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
                    + chrono::Duration::nanoseconds(120_000);
                enc.add_time("at", at);
                Ok(())
            }
        }

        let mut buf = Buffer::default();
        JsonEncoder::encode_object(&mut buf, &Stamp).unwrap();
        assert_eq!(buf.as_bytes(), br#"{"at":"2024-03-09T07:05:01.00012Z"}"#);
    }

    #[test]
    fn test_failing_marshaler_still_closes_object() {
        let mut buf = Buffer::default();
        let result = JsonEncoder::encode_object(&mut buf, &Failing);
        assert!(result.is_err());
        assert_eq!(buf.as_bytes(), br#"{"partial":"yes"}"#);
    }
}
