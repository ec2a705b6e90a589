//! Background delivery of encoded records
//!
//! A [`Worker`] owns one destination behind a mutex and a bounded queue of
//! pooled buffers. Its thread waits on either a control message or a queued
//! buffer, drains everything available, then flushes. Buffers are only ever
//! taken off the queue while the destination lock is held, which keeps the
//! sync-overflow path from reordering a thread's own records.

use crate::core::buffer::{Buffer, PooledBuffer};
use crate::core::diagnostics::{DiagnosticSink, ErrorReporter, StderrSink};
use crate::core::error::{LoggerError, Result};
use crate::core::metrics::WorkerMetrics;
use crate::core::overflow_policy::OverflowPolicy;
use crossbeam_channel::{bounded, unbounded, Receiver, Select, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Default number of buffers the queue holds.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

const WRITER_CAPACITY: usize = 64 * 1024;

/// A destination for encoded records.
pub type Destination = Box<dyn Write + Send>;

/// Lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WorkerState {
    Running = 0,
    DrainingForSync = 1,
    Stopping = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Running,
            1 => WorkerState::DrainingForSync,
            2 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

/// Settings for [`Worker::spawn`].
#[derive(Clone)]
pub struct WorkerOptions {
    /// Thread name.
    pub name: String,
    pub capacity: usize,
    pub policy: OverflowPolicy,
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            name: "log-worker".to_string(),
            capacity: DEFAULT_QUEUE_CAPACITY,
            policy: OverflowPolicy::default(),
            diagnostics: Arc::new(StderrSink),
        }
    }
}

impl fmt::Debug for WorkerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerOptions")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .finish()
    }
}

enum Control {
    Sync(Sender<io::Result<()>>),
    Stop,
}

/// State shared between the worker thread and submitters.
struct Inner {
    pending: Receiver<PooledBuffer>,
    writer: Mutex<BufWriter<Destination>>,
    reporter: ErrorReporter,
    metrics: WorkerMetrics,
    state: AtomicU8,
}

impl Inner {
    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Write everything queued. Returns true once the queue is disconnected.
    fn drain_locked(&self, writer: &mut BufWriter<Destination>) -> bool {
        loop {
            match self.pending.try_recv() {
                Ok(buf) => self.write_locked(writer, &buf),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
    }

    fn write_locked(&self, writer: &mut BufWriter<Destination>, buf: &Buffer) {
        match writer.write_all(buf.as_bytes()) {
            Ok(()) => {
                self.metrics.record_written();
            }
            Err(err) => {
                self.metrics.record_write_error();
                self.reporter.report(&format!("write failed: {}", err));
            }
        }
    }

    fn flush_locked(&self, writer: &mut BufWriter<Destination>) -> io::Result<()> {
        match writer.flush() {
            Ok(()) => {
                self.reporter.clear();
                Ok(())
            }
            Err(err) => {
                self.metrics.record_write_error();
                self.reporter.report(&format!("flush failed: {}", err));
                Err(err)
            }
        }
    }

    fn drain_and_flush(&self) -> (io::Result<()>, bool) {
        let mut writer = self.writer.lock();
        let disconnected = self.drain_locked(&mut writer);
        (self.flush_locked(&mut writer), disconnected)
    }

    /// Write `buf` on the calling thread, after anything already queued.
    fn write_through(&self, buf: &Buffer) {
        let mut writer = self.writer.lock();
        self.drain_locked(&mut writer);
        self.write_locked(&mut writer, buf);
        let _ = self.flush_locked(&mut writer);
        self.metrics.record_direct_write();
    }
}

fn run(inner: Arc<Inner>, control: Receiver<Control>) {
    let mut select = Select::new();
    let control_index = select.recv(&control);
    let pending_index = select.recv(&inner.pending);

    loop {
        let index = select.ready();
        if index == control_index {
            match control.try_recv() {
                Ok(Control::Sync(reply)) => {
                    let (result, _) = inner.drain_and_flush();
                    let _ = reply.send(result);
                    let _ = inner.state.compare_exchange(
                        WorkerState::DrainingForSync as u8,
                        WorkerState::Running as u8,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    );
                }
                Ok(Control::Stop) | Err(TryRecvError::Disconnected) => {
                    let _ = inner.drain_and_flush();
                    return;
                }
                Err(TryRecvError::Empty) => {}
            }
        } else if index == pending_index {
            let (_, disconnected) = inner.drain_and_flush();
            if disconnected {
                return;
            }
        }
    }
}

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Asynchronous writer for one destination.
///
/// # Example
///
/// ```
/// use rust_fast_logger::core::worker::{Worker, WorkerOptions};
/// use rust_fast_logger::output::SharedWriter;
/// use rust_fast_logger::Buffer;
///
/// let out = SharedWriter::new();
/// let worker = Worker::spawn(Box::new(out.clone()), WorkerOptions::default()).unwrap();
///
/// let mut buf = Buffer::acquire();
/// buf.push_str("hello\n");
/// worker.submit(buf);
///
/// worker.sync().unwrap();
/// assert_eq!(out.contents(), b"hello\n");
/// worker.stop();
/// ```
pub struct Worker {
    id: u64,
    name: String,
    policy: OverflowPolicy,
    capacity: usize,
    inner: Arc<Inner>,
    queue: Sender<PooledBuffer>,
    control: Sender<Control>,
    refs: AtomicUsize,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Start a worker thread writing to `destination`.
    pub fn spawn(destination: Destination, options: WorkerOptions) -> Result<Arc<Self>> {
        let capacity = options.capacity.max(1);
        let (queue, pending) = bounded(capacity);
        let (control, control_rx) = unbounded();
        let inner = Arc::new(Inner {
            pending,
            writer: Mutex::new(BufWriter::with_capacity(WRITER_CAPACITY, destination)),
            reporter: ErrorReporter::new(options.diagnostics),
            metrics: WorkerMetrics::new(),
            state: AtomicU8::new(WorkerState::Running as u8),
        });

        let thread_inner = Arc::clone(&inner);
        let handle = thread::Builder::new()
            .name(options.name.clone())
            .spawn(move || run(thread_inner, control_rx))
            .map_err(|e| LoggerError::io_operation("spawning log worker", options.name.clone(), e))?;

        Ok(Arc::new(Self {
            id: NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed),
            name: options.name,
            policy: options.policy,
            capacity,
            inner,
            queue,
            control,
            refs: AtomicUsize::new(1),
            handle: Mutex::new(Some(handle)),
        }))
    }

    /// Hand a finished record to the worker.
    pub fn submit(&self, buf: PooledBuffer) {
        if self.inner.state() == WorkerState::Stopped {
            self.inner.write_through(&buf);
            return;
        }

        match self.queue.try_send(buf) {
            Ok(()) => {
                self.inner.metrics.record_enqueued();
                // Stopped between the check and the send: nobody else will drain.
                if self.inner.state() == WorkerState::Stopped {
                    let _ = self.inner.drain_and_flush();
                }
            }
            Err(TrySendError::Full(buf)) => {
                self.inner.metrics.record_queue_full();
                self.overflow(buf);
            }
            Err(TrySendError::Disconnected(buf)) => self.inner.write_through(&buf),
        }
    }

    fn overflow(&self, buf: PooledBuffer) {
        match self.policy {
            OverflowPolicy::Sync => self.inner.write_through(&buf),
            OverflowPolicy::Drop => {
                self.inner.metrics.record_dropped();
            }
            OverflowPolicy::Block => {
                self.inner.metrics.record_block();
                match self.queue.send(buf) {
                    Ok(()) => {
                        self.inner.metrics.record_enqueued();
                        // stop() may have drained while we were parked.
                        if self.inner.state() == WorkerState::Stopped {
                            let _ = self.inner.drain_and_flush();
                        }
                    }
                    Err(err) => self.inner.write_through(&err.into_inner()),
                }
            }
        }
    }

    /// Block until every buffer submitted before this call is written and
    /// flushed.
    pub fn sync(&self) -> Result<()> {
        if self.inner.state() >= WorkerState::Stopping {
            let (result, _) = self.inner.drain_and_flush();
            return result.map_err(|e| self.flush_error(e));
        }

        let (reply, answer) = bounded(1);
        let _ = self.inner.state.compare_exchange(
            WorkerState::Running as u8,
            WorkerState::DrainingForSync as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if self.control.send(Control::Sync(reply)).is_err() {
            return Err(LoggerError::WorkerStopped);
        }
        match answer.recv() {
            Ok(result) => result.map_err(|e| self.flush_error(e)),
            // The thread exited before answering; stop() drained for us.
            Err(_) => Ok(()),
        }
    }

    fn flush_error(&self, err: io::Error) -> LoggerError {
        LoggerError::io_operation("flushing log destination", self.name.clone(), err)
    }

    /// Stop the thread after a final drain. Idempotent.
    pub fn stop(&self) {
        let previous = self
            .inner
            .state
            .fetch_max(WorkerState::Stopping as u8, Ordering::SeqCst);
        if previous >= WorkerState::Stopping as u8 {
            return;
        }

        let _ = self.control.send(Control::Stop);
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                self.inner
                    .reporter
                    .report(&format!("log worker '{}' panicked", self.name));
            }
        }
        self.inner
            .state
            .store(WorkerState::Stopped as u8, Ordering::SeqCst);
        let _ = self.inner.drain_and_flush();
    }

    /// Count one more owner.
    pub fn retain(&self) {
        self.refs.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop one owner; true when it was the last.
    pub fn release(&self) -> bool {
        self.refs.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Current number of owners.
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    /// Process-unique worker id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overflow policy.
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffers currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.inner.state()
    }

    /// Whether the thread has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.state() == WorkerState::Stopped
    }

    /// Delivery counters.
    pub fn metrics(&self) -> &WorkerMetrics {
        &self.inner.metrics
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("state", &self.state())
            .field("queued", &self.queued())
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Synchronous writer used when async delivery is disabled.
pub struct DirectWriter {
    writer: Mutex<Destination>,
    reporter: ErrorReporter,
    metrics: WorkerMetrics,
}

impl DirectWriter {
    /// Synchronous writer reporting failures to `diagnostics`.
    pub fn new(destination: Destination, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            writer: Mutex::new(destination),
            reporter: ErrorReporter::new(diagnostics),
            metrics: WorkerMetrics::new(),
        }
    }

    /// Write and flush `buf` on the calling thread.
    pub fn write(&self, buf: &Buffer) {
        let mut writer = self.writer.lock();
        let result = writer.write_all(buf.as_bytes()).and_then(|()| writer.flush());
        drop(writer);
        match result {
            Ok(()) => {
                self.metrics.record_written();
                self.metrics.record_direct_write();
            }
            Err(err) => {
                self.metrics.record_write_error();
                self.reporter.report(&format!("write failed: {}", err));
            }
        }
    }

    /// Flush the destination.
    pub fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .flush()
            .map_err(|e| LoggerError::io_operation("flushing log destination", "direct", e))
    }

    /// Delivery counters.
    pub fn metrics(&self) -> &WorkerMetrics {
        &self.metrics
    }
}

impl fmt::Debug for DirectWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectWriter")
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::tests::CollectingSink;
    use crate::output::SharedWriter;

    fn record(text: &str) -> PooledBuffer {
        let mut buf = Buffer::acquire();
        buf.push_str(text);
        buf
    }

    fn spawn(out: &SharedWriter, capacity: usize, policy: OverflowPolicy) -> Arc<Worker> {
        let options = WorkerOptions {
            name: "test-worker".into(),
            capacity,
            policy,
            ..WorkerOptions::default()
        };
        Worker::spawn(Box::new(out.clone()), options).unwrap()
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    #[test]
    fn test_sync_writes_in_submission_order() {
        let out = SharedWriter::new();
        let worker = spawn(&out, 16, OverflowPolicy::Sync);

        for i in 0..500 {
            worker.submit(record(&format!("line {}\n", i)));
        }
        worker.sync().unwrap();

        let expected: Vec<String> = (0..500).map(|i| format!("line {}", i)).collect();
        assert_eq!(out.lines(), expected);
        assert_eq!(worker.metrics().written_count(), 500);
        worker.stop();
    }

    #[test]
    fn test_drop_policy_discards_when_full() {
        let out = SharedWriter::new();
        let worker = spawn(&out, 1, OverflowPolicy::Drop);

        {
            // Nothing leaves the queue while the destination is locked.
            let _held = worker.inner.writer.lock();
            worker.submit(record("kept\n"));
            worker.submit(record("dropped\n"));
        }
        worker.sync().unwrap();

        assert_eq!(out.lines(), vec!["kept".to_string()]);
        assert_eq!(worker.metrics().dropped_count(), 1);
        assert_eq!(worker.metrics().queue_full_events(), 1);
        worker.stop();
    }

    #[test]
    fn test_sync_overflow_keeps_thread_order() {
        let out = SharedWriter::new();
        let worker = spawn(&out, 1, OverflowPolicy::Sync);

        for i in 0..200 {
            worker.submit(record(&format!("{}\n", i)));
        }
        worker.sync().unwrap();

        let lines: Vec<usize> = out.lines().iter().map(|l| l.parse().unwrap()).collect();
        assert_eq!(lines, (0..200).collect::<Vec<_>>());
        worker.stop();
    }

    #[test]
    fn test_block_policy_loses_nothing() {
        let out = SharedWriter::new();
        let worker = spawn(&out, 2, OverflowPolicy::Block);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let worker = Arc::clone(&worker);
                thread::spawn(move || {
                    for i in 0..250 {
                        worker.submit(record(&format!("{}-{}\n", t, i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        worker.sync().unwrap();

        assert_eq!(out.lines().len(), 1000);
        assert_eq!(worker.metrics().dropped_count(), 0);
        worker.stop();
    }

    #[test]
    fn test_stop_drains_then_writes_through() {
        let out = SharedWriter::new();
        let worker = spawn(&out, 64, OverflowPolicy::Sync);

        worker.submit(record("before\n"));
        worker.stop();
        assert!(worker.is_stopped());
        worker.submit(record("after\n"));
        worker.sync().unwrap();
        worker.stop();

        assert_eq!(out.lines(), vec!["before".to_string(), "after".to_string()]);
    }

    #[test]
    fn test_flush_failure_reported_once() {
        let sink = Arc::new(CollectingSink::default());
        let options = WorkerOptions {
            diagnostics: sink.clone(),
            ..WorkerOptions::default()
        };
        let worker = Worker::spawn(Box::new(Broken), options).unwrap();

        for _ in 0..3 {
            worker.submit(record("x\n"));
            assert!(worker.sync().is_err());
        }
        worker.stop();

        let messages = sink.0.lock();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("pipe closed"));
        assert!(worker.metrics().write_errors() >= 3);
    }

    #[test]
    fn test_ref_counting() {
        let out = SharedWriter::new();
        let worker = spawn(&out, 8, OverflowPolicy::Sync);
        worker.retain();
        assert_eq!(worker.ref_count(), 2);
        assert!(!worker.release());
        assert!(worker.release());
        worker.stop();
    }

    #[test]
    fn test_direct_writer_flushes_each_record() {
        let out = SharedWriter::new();
        let direct = DirectWriter::new(Box::new(out.clone()), Arc::new(StderrSink));
        direct.write(&record("one\n"));
        direct.write(&record("two\n"));
        assert_eq!(out.contents(), b"one\ntwo\n");
        assert_eq!(direct.metrics().written_count(), 2);
    }
}
