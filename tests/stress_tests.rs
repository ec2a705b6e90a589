//! Stress tests for asynchronous delivery
//!
//! These tests verify:
//! - No record is lost or reordered per thread under the sync and block policies
//! - The drop policy accounts for every submission
//! - Concurrent derivation and closing of handles
//! - Blocked submitters racing a worker shutdown
//! - Sampling under contention

use rust_fast_logger::core::worker::{Worker, WorkerOptions};
use rust_fast_logger::output::SharedWriter;
use rust_fast_logger::prelude::*;
use rust_fast_logger::{Buffer, WorkerRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const PER_THREAD: usize = 2_000;

fn async_logger(out: &SharedWriter, capacity: usize, policy: OverflowPolicy) -> Logger {
    Logger::builder()
        .output(out.clone())
        .async_mode(true)
        .queue_capacity(capacity)
        .overflow_policy(policy)
        .registry(Arc::new(WorkerRegistry::new()))
        .build()
        .expect("Failed to build logger")
}

/// Parse `INFO burst t=<thread> i=<seq>` lines into per-thread sequences.
fn sequences(lines: &[String]) -> HashMap<usize, Vec<usize>> {
    let mut seqs: HashMap<usize, Vec<usize>> = HashMap::new();
    for line in lines {
        let mut thread = None;
        let mut seq = None;
        for part in line.split(' ') {
            if let Some(v) = part.strip_prefix("t=") {
                thread = v.parse().ok();
            } else if let Some(v) = part.strip_prefix("i=") {
                seq = v.parse().ok();
            }
        }
        if let (Some(t), Some(i)) = (thread, seq) {
            seqs.entry(t).or_default().push(i);
        }
    }
    seqs
}

fn hammer(logger: &Logger) {
    thread::scope(|scope| {
        for t in 0..THREADS {
            let logger = logger.clone();
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    logger.info("burst", &[Value::from("t"), Value::from(t), Value::from("i"), Value::from(i)]);
                }
            });
        }
    });
}

fn assert_complete_and_ordered(lines: &[String]) {
    let seqs = sequences(lines);
    assert_eq!(seqs.len(), THREADS);
    for (t, seq) in seqs {
        assert_eq!(seq, (0..PER_THREAD).collect::<Vec<_>>(), "thread {} out of order", t);
    }
}

#[test]
fn test_sync_policy_loses_nothing() {
    let out = SharedWriter::new();
    let logger = async_logger(&out, 8, OverflowPolicy::Sync);

    hammer(&logger);
    logger.sync().expect("Failed to sync");

    let lines = out.lines();
    assert_eq!(lines.len(), THREADS * PER_THREAD);
    assert_complete_and_ordered(&lines);
    assert_eq!(logger.metrics().dropped_count(), 0);
}

#[test]
fn test_block_policy_loses_nothing() {
    let out = SharedWriter::new();
    let logger = async_logger(&out, 4, OverflowPolicy::Block);

    hammer(&logger);
    logger.sync().expect("Failed to sync");

    let lines = out.lines();
    assert_eq!(lines.len(), THREADS * PER_THREAD);
    assert_complete_and_ordered(&lines);
}

#[test]
fn test_drop_policy_accounts_for_everything() {
    let out = SharedWriter::new();
    let logger = async_logger(&out, 4, OverflowPolicy::Drop);

    hammer(&logger);
    logger.sync().expect("Failed to sync");

    let written = out.lines().len() as u64;
    let metrics = logger.metrics();
    assert_eq!(written + metrics.dropped_count(), (THREADS * PER_THREAD) as u64);
    assert_eq!(metrics.written_count(), written);

    // Survivors of each thread still appear in submission order.
    for (t, seq) in sequences(&out.lines()) {
        assert!(seq.windows(2).all(|w| w[0] < w[1]), "thread {} out of order", t);
    }
}

#[test]
fn test_blocked_submitters_survive_stop() {
    for _ in 0..20 {
        let out = SharedWriter::new();
        let worker = Worker::spawn(
            Box::new(out.clone()),
            WorkerOptions {
                capacity: 1,
                policy: OverflowPolicy::Block,
                ..WorkerOptions::default()
            },
        )
        .expect("Failed to spawn worker");

        thread::scope(|scope| {
            for t in 0..THREADS {
                let worker = &worker;
                scope.spawn(move || {
                    for i in 0..200 {
                        let mut buf = Buffer::acquire();
                        buf.push_str(&format!("t={} i={}\n", t, i));
                        worker.submit(buf);
                    }
                });
            }
            let worker = &worker;
            scope.spawn(move || {
                thread::sleep(Duration::from_millis(1));
                worker.stop();
            });
        });

        assert_eq!(out.lines().len(), THREADS * 200);
        let metrics = worker.metrics();
        assert_eq!(metrics.dropped_count(), 0);
    }
}

#[test]
fn test_concurrent_derive_and_close() {
    let out = SharedWriter::new();
    let registry = Arc::new(WorkerRegistry::new());
    let root = Logger::builder()
        .output(out.clone())
        .async_mode(true)
        .registry(Arc::clone(&registry))
        .build()
        .expect("Failed to build logger");

    thread::scope(|scope| {
        for t in 0..THREADS {
            let root = &root;
            scope.spawn(move || {
                for i in 0..100 {
                    let child = root.with(&[Value::from("t"), Value::from(t)]);
                    child.info("child", &[Value::from("i"), Value::from(i)]);
                    child.close().expect("Failed to close");
                }
            });
        }
    });

    assert_eq!(registry.len(), 1);
    root.sync().expect("Failed to sync");
    assert_eq!(out.lines().len(), THREADS * 100);

    root.close().expect("Failed to close");
    assert!(registry.is_empty());
}

#[test]
fn test_sampling_under_contention() {
    let out = SharedWriter::new();
    let logger = Logger::builder()
        .output(out.clone())
        .sampler(Sampler::new(SamplingConfig::new(Duration::from_secs(3600), 10, 0)))
        .build()
        .expect("Failed to build logger");

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let logger = &logger;
            scope.spawn(move || {
                for _ in 0..500 {
                    logger.info("hot path", &[]);
                }
            });
        }
    });

    let metrics = logger.sampler_metrics().expect("sampler installed");
    assert_eq!(metrics.total_count(), (THREADS * 500) as u64);
    assert_eq!(out.lines().len() as u64, metrics.sampled_count());
    // Threads racing to open the window may each reset the count once.
    let sampled = metrics.sampled_count();
    assert!(
        (10..=10 * (THREADS as u64 + 1)).contains(&sampled),
        "sampled {}",
        sampled
    );
}
