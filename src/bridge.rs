//! Adapter for the [`log`] facade
//!
//! [`LogBridge`] forwards records emitted through `log::info!` and friends
//! to a [`Logger`]. Key/value pairs attached with the `kv` syntax become
//! typed fields.

use crate::core::error::{LoggerError, Result};
use crate::core::field::{Field, Value};
use crate::core::log_level::LogLevel;
use crate::core::logger::Logger;
use std::borrow::Cow;
use std::fmt;

/// `log::Log` implementation writing through a [`Logger`].
///
/// # Example
///
/// ```
/// use log::Log;
/// use rust_fast_logger::output::SharedWriter;
/// use rust_fast_logger::{Field, LogBridge, Logger};
///
/// let out = SharedWriter::new();
/// let logger = Logger::builder().output(out.clone()).build().unwrap();
/// let bridge = LogBridge::new(logger).with_group("http");
///
/// bridge.log(
///     &log::Record::builder()
///         .level(log::Level::Info)
///         .args(format_args!("served"))
///         .key_values(&[("status", 200)])
///         .build(),
/// );
///
/// assert_eq!(out.lines(), vec!["INFO served http.status=200"]);
/// ```
pub struct LogBridge {
    logger: Logger,
    fields: Vec<Field<'static>>,
    group: String,
}

impl LogBridge {
    /// Wrap `logger` with no extra fields and no group.
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            fields: Vec::new(),
            group: String::new(),
        }
    }

    /// Derive a bridge that adds `fields` to every record.
    ///
    /// Keys are qualified with the current group.
    #[must_use]
    pub fn with_fields(&self, fields: &[Field<'static>]) -> LogBridge {
        let mut attached = self.fields.clone();
        attached.extend(
            fields
                .iter()
                .map(|field| Field::new(self.qualify(field.key()).into_owned(), field.value().clone())),
        );
        LogBridge {
            logger: self.logger.clone(),
            fields: attached,
            group: self.group.clone(),
        }
    }

    /// Derive a bridge whose later keys are prefixed with `name.`.
    ///
    /// An empty name returns an equivalent bridge.
    #[must_use]
    pub fn with_group(&self, name: &str) -> LogBridge {
        let group = if name.is_empty() {
            self.group.clone()
        } else {
            self.qualify(name).into_owned()
        };
        LogBridge {
            logger: self.logger.clone(),
            fields: self.fields.clone(),
            group,
        }
    }

    /// Install as the global `log` logger.
    ///
    /// The facade's maximum level follows the logger's level at install time.
    pub fn install(self) -> Result<()> {
        let max_level = match self.logger.level() {
            LogLevel::Debug => log::LevelFilter::Trace,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            _ => log::LevelFilter::Error,
        };
        log::set_boxed_logger(Box::new(self))
            .map_err(|e| LoggerError::config("log bridge", e.to_string()))?;
        log::set_max_level(max_level);
        Ok(())
    }

    /// The logger records are written through.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    fn qualify<'k>(&self, key: &'k str) -> Cow<'k, str> {
        if self.group.is_empty() {
            Cow::Borrowed(key)
        } else {
            Cow::Owned(format!("{}.{}", self.group, key))
        }
    }
}

impl fmt::Debug for LogBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBridge")
            .field("group", &self.group)
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// Facade level to logger level.
pub fn map_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug | log::Level::Trace => LogLevel::Debug,
    }
}

fn convert(value: &log::kv::Value<'_>) -> Value<'static> {
    if let Some(v) = value.to_bool() {
        Value::Bool(v)
    } else if let Some(v) = value.to_i64() {
        Value::Int(v)
    } else if let Some(v) = value.to_u64() {
        Value::Uint(v)
    } else if let Some(v) = value.to_f64() {
        Value::Float(v)
    } else {
        Value::Str(Cow::Owned(value.to_string()))
    }
}

struct FieldCollector<'b> {
    bridge: &'b LogBridge,
    fields: Vec<Field<'static>>,
}

impl<'kvs> log::kv::VisitSource<'kvs> for FieldCollector<'_> {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> std::result::Result<(), log::kv::Error> {
        let key = self.bridge.qualify(key.as_str()).into_owned();
        self.fields.push(Field::new(key, convert(&value)));
        Ok(())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.logger.enabled(map_level(metadata.level()))
    }

    fn log(&self, record: &log::Record<'_>) {
        let level = map_level(record.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut collector = FieldCollector {
            bridge: self,
            fields: self.fields.clone(),
        };
        if let Err(err) = record.key_values().visit(&mut collector) {
            collector
                .fields
                .push(Field::string("kv_error", err.to_string()));
        }

        match record.args().as_str() {
            Some(message) => self.logger.log_fields(level, message, &collector.fields),
            None => {
                let message = record.args().to_string();
                self.logger.log_fields(level, &message, &collector.fields);
            }
        }
    }

    fn flush(&self) {
        let _ = self.logger.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SharedWriter;
    use log::Log;

    fn bridge(out: &SharedWriter) -> LogBridge {
        let logger = Logger::builder()
            .level(LogLevel::Debug)
            .output(out.clone())
            .build()
            .unwrap();
        LogBridge::new(logger)
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(map_level(log::Level::Error), LogLevel::Error);
        assert_eq!(map_level(log::Level::Warn), LogLevel::Warn);
        assert_eq!(map_level(log::Level::Info), LogLevel::Info);
        assert_eq!(map_level(log::Level::Debug), LogLevel::Debug);
        assert_eq!(map_level(log::Level::Trace), LogLevel::Debug);
    }

    #[test]
    fn test_enabled_follows_logger_level() {
        let out = SharedWriter::new();
        let bridge = bridge(&out);
        bridge.logger().set_level(LogLevel::Warn);

        let info = log::Metadata::builder().level(log::Level::Info).build();
        let error = log::Metadata::builder().level(log::Level::Error).build();
        assert!(!bridge.enabled(&info));
        assert!(bridge.enabled(&error));
    }

    #[test]
    fn test_key_values_become_fields() {
        let out = SharedWriter::new();
        let bridge = bridge(&out);

        bridge.log(
            &log::Record::builder()
                .level(log::Level::Warn)
                .args(format_args!("slow {}", "query"))
                .key_values(&[("ms", 120)])
                .build(),
        );
        bridge.log(
            &log::Record::builder()
                .level(log::Level::Trace)
                .args(format_args!("ok"))
                .key_values(&[("cached", true)])
                .build(),
        );

        assert_eq!(out.lines(), vec!["WARN slow query ms=120", "DEBU ok cached=true"]);
    }

    #[test]
    fn test_groups_qualify_later_keys() {
        let out = SharedWriter::new();
        let bridge = bridge(&out)
            .with_fields(&[Field::string("app", "api")])
            .with_group("http")
            .with_fields(&[Field::string("method", "GET")])
            .with_group("")
            .with_group("req");

        bridge.log(
            &log::Record::builder()
                .level(log::Level::Info)
                .args(format_args!("done"))
                .key_values(&[("id", 7)])
                .build(),
        );

        assert_eq!(
            out.lines(),
            vec!["INFO done app=api http.method=GET http.req.id=7"]
        );
    }

    #[test]
    fn test_string_values_are_kept() {
        let out = SharedWriter::new();
        let bridge = bridge(&out);

        bridge.log(
            &log::Record::builder()
                .level(log::Level::Error)
                .args(format_args!("failed"))
                .key_values(&[("path", "/a b")])
                .build(),
        );

        assert_eq!(out.lines(), vec![r#"ERRO failed path="/a b""#]);
    }
}
