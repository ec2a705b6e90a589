//! Property-based tests for rust_fast_logger using proptest

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_fast_logger::output::SharedWriter;
use rust_fast_logger::prelude::*;
use rust_fast_logger::Buffer;
use std::time::Duration;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::DPanic),
        Just(LogLevel::Panic),
        Just(LogLevel::Fatal),
    ]
}

fn json_logger(out: &SharedWriter) -> Logger {
    Logger::builder()
        .output(out.clone())
        .formatter(OutputFormat::Json)
        .build()
        .unwrap()
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Level names parse back to the same level, in any case
    #[test]
    fn test_log_level_str_roundtrip(level in any_level(), upper in any::<bool>()) {
        let name = if upper {
            level.to_str().to_uppercase()
        } else {
            level.to_str().to_string()
        };
        let parsed: LogLevel = name.parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// Ordering follows the numeric severity
    #[test]
    fn test_log_level_ordering(level1 in any_level(), level2 in any_level()) {
        prop_assert_eq!(level1 <= level2, level1.as_i8() <= level2.as_i8());
        prop_assert!(LogLevel::Print > level1);
    }
}

// ============================================================================
// Encoder Tests
// ============================================================================

proptest! {
    /// Any message and string value survive JSON encoding unchanged
    #[test]
    fn test_json_strings_roundtrip(message in any::<String>(), value in any::<String>()) {
        let out = SharedWriter::new();
        let logger = json_logger(&out);

        logger.info_fields(&message, &[Field::string("v", value.as_str())]);

        let lines = out.lines();
        prop_assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        prop_assert_eq!(parsed["v"].as_str(), Some(value.as_str()));
        if message.is_empty() {
            prop_assert!(parsed.get("msg").is_none());
        } else {
            prop_assert_eq!(parsed["msg"].as_str(), Some(message.as_str()));
        }
    }

    /// Finite floats round-trip; non-finite ones become null
    #[test]
    fn test_json_floats(value in any::<f64>()) {
        let out = SharedWriter::new();
        let logger = json_logger(&out);

        logger.info_fields("f", &[Field::float("x", value)]);

        let parsed: serde_json::Value = serde_json::from_str(&out.lines()[0]).unwrap();
        if value.is_finite() {
            prop_assert_eq!(parsed["x"].as_f64(), Some(value));
        } else {
            prop_assert!(parsed["x"].is_null());
        }
    }

    /// Text values are quoted exactly when they contain a space or `=`
    #[test]
    fn test_text_quoting(value in "[a-z0-9 =/_.-]{0,24}") {
        let out = SharedWriter::new();
        let logger = Logger::builder().output(out.clone()).build().unwrap();

        logger.info_fields("m", &[Field::string("k", value.as_str())]);

        let expected = if value.contains(' ') || value.contains('=') {
            format!("INFO m k=\"{}\"", value)
        } else {
            format!("INFO m k={}", value)
        };
        prop_assert_eq!(&out.lines()[0], &expected);
    }

    /// Records that take the slow path encode like the fast path
    #[test]
    fn test_fast_and_slow_paths_agree(
        json in any::<bool>(),
        ints in prop::collection::vec(any::<i64>(), 0..6),
        name in "[a-z ]{0,12}",
        flag in any::<bool>(),
    ) {
        let formatter = if json { OutputFormat::Json } else { OutputFormat::Text };
        let build = |out: &SharedWriter, slow: bool| {
            Logger::builder()
                .output(out.clone())
                .formatter(formatter)
                .report_timestamp(true)
                .time_source(std::sync::Arc::new(|| {
                    Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap()
                }))
                // Stack capture only happens at error level, so info records
                // take the slow path without gaining any output.
                .report_stacktrace(slow)
                .keyvals(vec![Value::from("svc"), Value::from("auth")])
                .build()
                .unwrap()
        };
        let fast_out = SharedWriter::new();
        let slow_out = SharedWriter::new();
        let fast = build(&fast_out, false);
        let slow = build(&slow_out, true);

        for logger in [&fast, &slow] {
            logger.info_fields(
                "event",
                &[
                    Field::ints("ints", &ints),
                    Field::string("name", name.as_str()),
                    Field::bool("flag", flag),
                ],
            );
        }

        prop_assert_eq!(fast_out.contents(), slow_out.contents());
    }

    /// Encoding the same record twice is byte-identical
    #[test]
    fn test_encoding_is_deterministic(key in "[a-z]{1,8}", value in any::<i64>()) {
        let out = SharedWriter::new();
        let logger = json_logger(&out).with(&[Value::from(key.clone()), Value::from(value)]);

        logger.warn("again", &[]);
        logger.warn("again", &[]);

        let lines = out.lines();
        prop_assert_eq!(&lines[0], &lines[1]);
    }
}

// ============================================================================
// Buffer and Sampler Tests
// ============================================================================

proptest! {
    /// A released buffer comes back empty
    #[test]
    fn test_reacquired_buffer_is_empty(bytes in prop::collection::vec(any::<u8>(), 0..8192)) {
        let mut buf = Buffer::acquire();
        buf.extend_from_slice(&bytes);
        drop(buf);

        let buf = Buffer::acquire();
        prop_assert!(buf.is_empty());
    }

    /// Within one window the sampler admits the first N, then every Mth
    #[test]
    fn test_sampler_admission_pattern(
        first in 0_u64..5,
        thereafter in 0_u64..5,
        checks in 1_u64..30,
        message in "[a-z]{1,16}",
    ) {
        let sampler = Sampler::new(SamplingConfig::new(Duration::from_secs(3600), first, thereafter));
        let now = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();

        for count in 1..=checks {
            let expected = count <= first
                || (thereafter > 0 && (count - first) % thereafter == 0);
            prop_assert_eq!(sampler.check(LogLevel::Info, &message, now), expected);
        }
        prop_assert_eq!(sampler.metrics().total_count(), checks);
    }
}
