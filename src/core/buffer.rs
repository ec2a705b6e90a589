//! Pooled byte buffers
//!
//! Every formatted record is written into a [`Buffer`] drawn from a process-wide
//! pool. The [`Pooled`] guard owns the buffer while it moves from the encoder to
//! the worker queue and returns it to the pool when dropped, so a released
//! buffer can no longer be reached by the code that released it.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::fmt;
use std::io;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

/// Capacity of a freshly allocated buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Buffers that grew past this capacity are discarded instead of pooled.
pub const MAX_POOLED_CAPACITY: usize = 64 * 1024;

/// Upper bound on idle items kept by a pool.
const POOL_SLOTS: usize = 1024;

/// An item that can be reset and handed out again by a [`Pool`].
///
/// `Default` must be cheap: it is used as the placeholder left behind when a
/// guard gives its item back.
pub trait Recycle: Default + Send + 'static {
    /// Build a ready-to-use item when the pool is empty.
    fn fresh() -> Self;

    /// Clear content while keeping allocated capacity.
    fn reset(&mut self);

    /// Whether the item should go back to the pool at all.
    fn recyclable(&self) -> bool {
        true
    }
}

/// A bounded, lock-free free list.
///
/// Acquisition order is unspecified: the item handed out is not necessarily
/// the one most recently released.
pub struct Pool<T> {
    idle_tx: Sender<T>,
    idle_rx: Receiver<T>,
}

impl<T: Recycle> Pool<T> {
    /// Pool holding at most `slots` idle items.
    pub fn new(slots: usize) -> Self {
        let (idle_tx, idle_rx) = bounded(slots);
        Self { idle_tx, idle_rx }
    }

    /// Take an empty item, allocating one if the pool has none idle.
    pub fn acquire(&'static self) -> Pooled<T> {
        let item = self.idle_rx.try_recv().unwrap_or_else(|_| T::fresh());
        Pooled { item, pool: self }
    }

    /// Number of idle items currently held.
    pub fn idle(&self) -> usize {
        self.idle_rx.len()
    }

    fn release(&self, mut item: T) {
        if !item.recyclable() {
            return;
        }
        item.reset();
        // A full pool simply lets the item go.
        let _ = self.idle_tx.try_send(item);
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.idle_rx.len())
            .finish()
    }
}

/// Exclusive ownership of a pooled item; returns it to its pool on drop.
pub struct Pooled<T: Recycle> {
    item: T,
    pool: &'static Pool<T>,
}

impl<T: Recycle> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: Recycle> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: Recycle> Drop for Pooled<T> {
    fn drop(&mut self) {
        let item = mem::take(&mut self.item);
        self.pool.release(item);
    }
}

impl<T: Recycle + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.item.fmt(f)
    }
}

/// A buffer checked out of the global buffer pool.
pub type PooledBuffer = Pooled<Buffer>;

/// Growable byte sequence used as the encoding target and the unit of I/O.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    /// Empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Take an empty buffer from the process-wide pool.
    pub fn acquire() -> PooledBuffer {
        buffer_pool().acquire()
    }

    /// Encoded bytes so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes written.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Allocated capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Append one byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Append raw bytes.
    #[inline]
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Append UTF-8 text.
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
    }

    /// Shorten to `len` bytes; no-op if already shorter.
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Drop the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Final byte, if any.
    pub fn last(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    /// Bytes written since `start`.
    pub fn since(&self, start: usize) -> &[u8] {
        &self.bytes[start.min(self.bytes.len())..]
    }

    /// Insert `bytes` at byte offset `at`, shifting the tail.
    pub fn insert_bytes(&mut self, at: usize, bytes: &[u8]) {
        let at = at.min(self.bytes.len());
        self.bytes.splice(at..at, bytes.iter().copied());
    }

    /// Append a signed integer in decimal.
    pub fn push_i64(&mut self, value: i64) {
        self.push_str(itoa::Buffer::new().format(value));
    }

    /// Append an unsigned integer in decimal.
    pub fn push_u64(&mut self, value: u64) {
        self.push_str(itoa::Buffer::new().format(value));
    }

    /// Append a 128-bit unsigned integer in decimal.
    pub fn push_u128(&mut self, value: u128) {
        self.push_str(itoa::Buffer::new().format(value));
    }

    /// Append `true` or `false`.
    pub fn push_bool(&mut self, value: bool) {
        self.push_str(if value { "true" } else { "false" });
    }

    /// Shortest round-trip representation; non-finite values as `NaN`/`inf`.
    pub fn push_f64(&mut self, value: f64) {
        if value.is_finite() {
            self.push_str(ryu::Buffer::new().format_finite(value));
        } else if value.is_nan() {
            self.push_str("NaN");
        } else if value.is_sign_negative() {
            self.push_str("-inf");
        } else {
            self.push_str("inf");
        }
    }
}

impl Recycle for Buffer {
    fn fresh() -> Self {
        Buffer::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    fn reset(&mut self) {
        self.bytes.clear();
    }

    fn recyclable(&self) -> bool {
        self.bytes.capacity() <= MAX_POOLED_CAPACITY
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

fn buffer_pool() -> &'static Pool<Buffer> {
    static POOL: OnceLock<Pool<Buffer>> = OnceLock::new();
    POOL.get_or_init(|| Pool::new(POOL_SLOTS))
}
