//! Registry of live workers
//!
//! Fatal-level records must reach every destination before the process
//! exits, not only the one the fatal logger writes to. Loggers register their
//! worker here when built and unregister it when the last handle closes.

use crate::core::error::Result;
use crate::core::worker::Worker;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Set of workers that [`WorkerRegistry::flush_all`] syncs.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: Mutex<HashMap<u64, Arc<Worker>>>,
}

impl WorkerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used when a builder is given none.
    pub fn global() -> Arc<WorkerRegistry> {
        static GLOBAL: OnceLock<Arc<WorkerRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(WorkerRegistry::new())))
    }

    /// Track `worker` until it is unregistered.
    pub fn register(&self, worker: Arc<Worker>) {
        self.workers.lock().insert(worker.id(), worker);
    }

    /// Stop tracking the worker with `id`.
    pub fn unregister(&self, id: u64) -> Option<Arc<Worker>> {
        self.workers.lock().remove(&id)
    }

    /// Whether a worker with `id` is tracked.
    pub fn contains(&self, id: u64) -> bool {
        self.workers.lock().contains_key(&id)
    }

    /// Number of tracked workers.
    pub fn len(&self) -> usize {
        self.workers.lock().len()
    }

    /// Whether no worker is tracked.
    pub fn is_empty(&self) -> bool {
        self.workers.lock().is_empty()
    }

    /// Sync every registered worker, returning the first error.
    ///
    /// Workers are synced outside the registry lock, so a slow destination
    /// never blocks registration.
    pub fn flush_all(&self) -> Result<()> {
        let workers: Vec<Arc<Worker>> = self.workers.lock().values().cloned().collect();
        let mut first_error = None;
        for worker in workers {
            if let Err(err) = worker.sync() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::Buffer;
    use crate::core::worker::WorkerOptions;
    use crate::output::SharedWriter;

    fn worker(out: &SharedWriter) -> Arc<Worker> {
        Worker::spawn(Box::new(out.clone()), WorkerOptions::default()).unwrap()
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = WorkerRegistry::new();
        let w = worker(&SharedWriter::new());

        registry.register(Arc::clone(&w));
        assert!(registry.contains(w.id()));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(w.id()).is_some());
        assert!(registry.is_empty());
        assert!(registry.unregister(w.id()).is_none());
        w.stop();
    }

    #[test]
    fn test_flush_all_syncs_every_worker() {
        let registry = WorkerRegistry::new();
        let outs: Vec<SharedWriter> = (0..3).map(|_| SharedWriter::new()).collect();
        let workers: Vec<Arc<Worker>> = outs.iter().map(worker).collect();

        for (i, w) in workers.iter().enumerate() {
            registry.register(Arc::clone(w));
            let mut buf = Buffer::acquire();
            buf.push_str(&format!("worker {}\n", i));
            w.submit(buf);
        }
        registry.flush_all().unwrap();

        for (i, out) in outs.iter().enumerate() {
            assert_eq!(out.lines(), vec![format!("worker {}", i)]);
        }
        for w in &workers {
            assert!(!w.is_stopped());
            w.stop();
        }
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&WorkerRegistry::global(), &WorkerRegistry::global()));
    }
}
