//! Per-message rate limiting for high-volume scenarios
//!
//! Within every `tick`, the first `first` records with a given level and
//! message pass, then every `thereafter`-th one. Counters are bucketed by an
//! FNV-1a hash of the message, so distinct messages sharing a bucket share a
//! budget.
//!
//! # Example
//!
//! ```
//! use rust_fast_logger::{LogLevel, Sampler, SamplingConfig};
//! use chrono::Utc;
//! use std::time::Duration;
//!
//! let sampler = Sampler::new(SamplingConfig::new(Duration::from_secs(1), 2, 0));
//! let now = Utc::now();
//!
//! assert!(sampler.check(LogLevel::Info, "retrying", now));
//! assert!(sampler.check(LogLevel::Info, "retrying", now));
//! assert!(!sampler.check(LogLevel::Info, "retrying", now));
//! ```

use super::log_level::{LogLevel, SAMPLED_LEVELS};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counter buckets per level.
pub const SAMPLER_BUCKETS: usize = 4096;

const FNV_OFFSET: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Configuration for log sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Length of one counting window.
    pub tick: Duration,

    /// Records allowed per window before thinning starts.
    pub first: u64,

    /// After `first`, allow every `thereafter`-th record; zero drops the rest.
    pub thereafter: u64,
}

impl SamplingConfig {
    /// Window of `tick`, letting `first` records through, then every `thereafter`-th.
    pub fn new(tick: Duration, first: u64, thereafter: u64) -> Self {
        Self {
            tick,
            first,
            thereafter,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 100, 100)
    }
}

/// Outcome reported to a [`SamplerHook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingDecision {
    Sampled,
    Dropped,
}

/// Observer invoked for every sampling decision.
pub type SamplerHook = Arc<dyn Fn(LogLevel, &str, SamplingDecision) + Send + Sync>;

/// Sampling decisions, counted per level
///
/// Print records never reach the sampler and are not counted.
///
/// # Example
///
/// ```
/// use rust_fast_logger::{LogLevel, SamplerMetrics};
///
/// let metrics = SamplerMetrics::new();
/// assert_eq!(metrics.sampled_count(), 0);
/// assert_eq!(metrics.dropped_for(LogLevel::Warn), 0);
/// ```
#[derive(Debug)]
pub struct SamplerMetrics {
    /// Records that passed, indexed by level slot
    sampled: [AtomicU64; SAMPLED_LEVELS],

    /// Records thinned out, indexed by level slot
    dropped: [AtomicU64; SAMPLED_LEVELS],
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU64 = AtomicU64::new(0);

fn sum(counters: &[AtomicU64]) -> u64 {
    counters.iter().map(|c| c.load(Ordering::Relaxed)).sum()
}

impl SamplerMetrics {
    /// Create metrics with every counter at zero
    pub const fn new() -> Self {
        Self {
            sampled: [ZERO; SAMPLED_LEVELS],
            dropped: [ZERO; SAMPLED_LEVELS],
        }
    }

    /// Records that passed, across all levels
    pub fn sampled_count(&self) -> u64 {
        sum(&self.sampled)
    }

    /// Records dropped, across all levels
    pub fn dropped_count(&self) -> u64 {
        sum(&self.dropped)
    }

    /// Every decision made so far
    pub fn total_count(&self) -> u64 {
        self.sampled_count() + self.dropped_count()
    }

    /// Records of `level` that passed
    pub fn sampled_for(&self, level: LogLevel) -> u64 {
        level
            .sampler_slot()
            .map_or(0, |slot| self.sampled[slot].load(Ordering::Relaxed))
    }

    /// Records of `level` that were dropped
    pub fn dropped_for(&self, level: LogLevel) -> u64 {
        level
            .sampler_slot()
            .map_or(0, |slot| self.dropped[slot].load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn record(&self, slot: usize, decision: SamplingDecision) {
        let counters = match decision {
            SamplingDecision::Sampled => &self.sampled,
            SamplingDecision::Dropped => &self.dropped,
        };
        counters[slot].fetch_add(1, Ordering::Relaxed);
    }

    /// Fraction of checked records that passed
    ///
    /// Returns 1.0 before any check.
    pub fn effective_sample_rate(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            1.0
        } else {
            self.sampled_count() as f64 / total as f64
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.sampled.iter().chain(&self.dropped) {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SamplerMetrics {
    fn clone(&self) -> Self {
        let copy = Self::new();
        for (to, from) in copy.sampled.iter().zip(&self.sampled) {
            to.store(from.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        for (to, from) in copy.dropped.iter().zip(&self.dropped) {
            to.store(from.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        copy
    }
}

/// One window counter.
#[derive(Debug, Default)]
struct Counter {
    reset_at: AtomicI64,
    count: AtomicU64,
}

impl Counter {
    /// Count one record at `now`, opening a new window if the old one expired.
    ///
    /// Two threads may both observe an expired window; the CAS loser counts
    /// into the window the winner opened.
    fn inc_check_reset(&self, now: i64, tick: i64) -> u64 {
        let reset_at = self.reset_at.load(Ordering::Acquire);
        if reset_at > now {
            return self.count.fetch_add(1, Ordering::AcqRel) + 1;
        }
        self.count.store(1, Ordering::Release);
        let next = now.saturating_add(tick);
        if self
            .reset_at
            .compare_exchange(reset_at, next, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return self.count.fetch_add(1, Ordering::AcqRel) + 1;
        }
        1
    }
}

/// FNV-1a over the message bytes.
fn fnv32a(message: &str) -> u32 {
    message.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Log sampler for high-volume scenarios
///
/// Thread-safe; every decision is a handful of atomic operations on a
/// pre-allocated counter table.
pub struct Sampler {
    config: SamplingConfig,
    tick_nanos: i64,
    counters: Box<[Counter]>,
    hook: Option<SamplerHook>,
    metrics: SamplerMetrics,
}

impl Sampler {
    /// Create a sampler with an empty counter table.
    pub fn new(config: SamplingConfig) -> Self {
        let counters = (0..SAMPLED_LEVELS * SAMPLER_BUCKETS)
            .map(|_| Counter::default())
            .collect();
        Self {
            config,
            tick_nanos: i64::try_from(config.tick.as_nanos()).unwrap_or(i64::MAX),
            counters,
            hook: None,
            metrics: SamplerMetrics::new(),
        }
    }

    /// Observe every decision through `hook`.
    #[must_use]
    pub fn with_hook(mut self, hook: SamplerHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Whether a record with this level and message, logged at `time`,
    /// should be written.
    pub fn check(&self, level: LogLevel, message: &str, time: DateTime<Utc>) -> bool {
        let Some(slot) = level.sampler_slot() else {
            return true;
        };
        let now = time.timestamp_nanos_opt().unwrap_or(i64::MAX);
        let bucket = fnv32a(message) as usize % SAMPLER_BUCKETS;
        let n = self.counters[slot * SAMPLER_BUCKETS + bucket].inc_check_reset(now, self.tick_nanos);

        let first = self.config.first;
        let thereafter = self.config.thereafter;
        let keep = n <= first || (thereafter > 0 && (n - first) % thereafter == 0);

        let decision = if keep {
            SamplingDecision::Sampled
        } else {
            SamplingDecision::Dropped
        };
        self.metrics.record(slot, decision);
        if let Some(hook) = &self.hook {
            hook(level, message, decision);
        }
        keep
    }

    /// Decisions made so far, per level.
    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }

    /// Window configuration.
    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parking_lot::Mutex;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn run(sampler: &Sampler, n: usize) -> Vec<bool> {
        (0..n)
            .map(|_| sampler.check(LogLevel::Info, "same message", at(0)))
            .collect()
    }

    #[test]
    fn test_first_then_drop_all() {
        let sampler = Sampler::new(SamplingConfig::new(Duration::from_secs(1), 2, 0));
        assert_eq!(run(&sampler, 5), vec![true, true, false, false, false]);
    }

    #[test]
    fn test_first_then_every_nth() {
        let sampler = Sampler::new(SamplingConfig::new(Duration::from_secs(1), 1, 3));
        assert_eq!(run(&sampler, 6), vec![true, false, false, true, false, false]);
    }

    #[test]
    fn test_window_resets_after_tick() {
        let sampler = Sampler::new(SamplingConfig::new(Duration::from_secs(1), 1, 0));
        assert!(sampler.check(LogLevel::Info, "m", at(0)));
        assert!(!sampler.check(LogLevel::Info, "m", at(0)));
        assert!(sampler.check(LogLevel::Info, "m", at(2)));
        assert!(!sampler.check(LogLevel::Info, "m", at(2)));
    }

    #[test]
    fn test_levels_and_messages_counted_separately() {
        let sampler = Sampler::new(SamplingConfig::new(Duration::from_secs(1), 1, 0));
        assert!(sampler.check(LogLevel::Info, "a", at(0)));
        assert!(sampler.check(LogLevel::Warn, "a", at(0)));
        assert!(sampler.check(LogLevel::Info, "b", at(0)));
        assert!(!sampler.check(LogLevel::Info, "a", at(0)));
    }

    #[test]
    fn test_print_level_always_passes() {
        let sampler = Sampler::new(SamplingConfig::new(Duration::from_secs(1), 0, 0));
        for _ in 0..10 {
            assert!(sampler.check(LogLevel::Print, "banner", at(0)));
        }
        assert_eq!(sampler.metrics().total_count(), 0);
    }

    #[test]
    fn test_hook_sees_every_decision() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sampler = Sampler::new(SamplingConfig::new(Duration::from_secs(1), 1, 0)).with_hook(
            Arc::new(move |level: LogLevel, msg: &str, decision: SamplingDecision| {
                sink.lock().push((level, msg.to_string(), decision));
            }),
        );

        sampler.check(LogLevel::Warn, "disk", at(0));
        sampler.check(LogLevel::Warn, "disk", at(0));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].2, SamplingDecision::Sampled);
        assert_eq!(seen[1], (LogLevel::Warn, "disk".to_string(), SamplingDecision::Dropped));
    }

    #[test]
    fn test_sampler_metrics_per_level() {
        let sampler = Sampler::new(SamplingConfig::new(Duration::from_secs(1), 1, 0));
        let metrics = sampler.metrics();
        assert_eq!(metrics.effective_sample_rate(), 1.0);

        for _ in 0..3 {
            sampler.check(LogLevel::Info, "poll", at(0));
        }
        sampler.check(LogLevel::Error, "poll", at(0));
        sampler.check(LogLevel::Print, "poll", at(0));

        assert_eq!(metrics.sampled_for(LogLevel::Info), 1);
        assert_eq!(metrics.dropped_for(LogLevel::Info), 2);
        assert_eq!(metrics.sampled_for(LogLevel::Error), 1);
        assert_eq!(metrics.dropped_for(LogLevel::Error), 0);
        assert_eq!(metrics.sampled_for(LogLevel::Print), 0);
        assert_eq!(metrics.sampled_count(), 2);
        assert_eq!(metrics.dropped_count(), 2);
        assert_eq!(metrics.total_count(), 4);
        assert!((metrics.effective_sample_rate() - 0.5).abs() < f64::EPSILON);

        let snapshot = metrics.clone();
        metrics.reset();
        assert_eq!(metrics.total_count(), 0);
        assert_eq!(snapshot.dropped_for(LogLevel::Info), 2);
    }

    #[test]
    fn test_fnv32a_known_values() {
        assert_eq!(fnv32a(""), FNV_OFFSET);
        assert_eq!(fnv32a("a"), 0xe40c_292c);
    }

    #[test]
    fn test_concurrent_checks_respect_budget() {
        let sampler = Arc::new(Sampler::new(SamplingConfig::new(
            Duration::from_secs(3600),
            100,
            0,
        )));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sampler = Arc::clone(&sampler);
                std::thread::spawn(move || {
                    (0..200)
                        .filter(|_| sampler.check(LogLevel::Info, "hot", at(0)))
                        .count()
                })
            })
            .collect();
        let passed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // A window-opening race may reset the count a few times, never below budget.
        assert!(passed >= 100);
        assert!(passed <= 400);
        assert_eq!(sampler.metrics().total_count(), 800);
    }
}
