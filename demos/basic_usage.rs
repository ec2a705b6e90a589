//! Basic logger usage example
//!
//! Demonstrates text and JSON output, derived loggers, async delivery and
//! sampling.
//!
//! Run with: cargo run --example basic_usage

use rust_fast_logger::prelude::*;
use rust_fast_logger::{info, output, warn, Styles};
use std::io;
use std::time::Duration;

struct Order {
    id: u64,
    items: u64,
    total: f64,
}

impl ObjectMarshaler for Order {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        enc.add_u64("id", self.id);
        enc.add_u64("items", self.items);
        enc.add_f64("total", self.total);
        Ok(())
    }
}

fn main() -> Result<()> {
    println!("=== Rust Fast Logger - Basic Usage Example ===\n");

    println!("1. Text output at different levels:");
    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .output(io::stdout())
        .report_timestamp(true)
        .styles(Styles::colored())
        .build()?;
    logger.debug("This is a debug message", &[]);
    logger.info("This is an info message", &[Value::from("port"), Value::from(8080)]);
    logger.warn("Disk almost full", &[Value::from("path"), Value::from("/var/lib/my data")]);
    logger.error_fields(
        "Request failed",
        &[Field::err(&io::Error::new(io::ErrorKind::TimedOut, "upstream timeout"))],
    );
    logger.print("Unlabelled output", &[]);

    println!("\n2. Derived loggers and macros:");
    let db = logger.with_prefix("db").with(&[Value::from("pool"), Value::from("primary")]);
    info!(db, "connected in {} ms", 12; "replicas" => 2);
    warn!(db, "slow query"; "took" => Duration::from_millis(1500));

    println!("\n3. JSON output through a background worker:");
    let json = Logger::builder()
        .output(output::stdout())
        .async_mode(true)
        .formatter(OutputFormat::Json)
        .report_caller(true)
        .process_info(true)
        .build()?;
    let order = Order {
        id: 42,
        items: 3,
        total: 99.5,
    };
    json.info_fields("order placed", &[Field::object("order", &order)]);
    json.sync()?;

    println!("\n4. Sampling repeated messages (first 3 per second):");
    let sampled = logger.with_sampler(Sampler::new(SamplingConfig::new(
        Duration::from_secs(1),
        3,
        0,
    )));
    for i in 0..10 {
        sampled.info("heartbeat", &[Value::from("i"), Value::from(i)]);
    }
    if let Some(metrics) = sampled.sampler_metrics() {
        println!(
            "   sampled={} dropped={}",
            metrics.sampled_count(),
            metrics.dropped_count()
        );
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
