//! Bounded reusable buffer pool with memory-pressure classification.
//!
//! Two free-lists (compute buffers for signal work, byte buffers for bit
//! scratch) are lent out through RAII guards, so a buffer always returns
//! to the pool on every exit path, including error unwind and task
//! cancellation. Resident bytes (pooled + lent) are tracked and
//! classified into pressure levels; entering warning shrinks the pools,
//! entering critical clears them and broadcasts an event so other
//! components can release caches.
//!
//! The pool is the only shared mutable structure in the engine. All
//! free-list access and every level transition runs under one mutex.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Maximum entries kept per free-list.
pub const MAX_POOL_ENTRIES: usize = 10;

/// Entries kept per free-list after a warning-level shrink.
const SHRINK_FLOOR: usize = 2;

const DEFAULT_WARNING_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_CRITICAL_BYTES: usize = 200 * 1024 * 1024;

/// Memory-pressure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PressureLevel {
    /// Plenty of headroom.
    Normal,
    /// Above the first threshold; pools shrink, batches halve.
    Warning,
    /// Above the second threshold; pools clear, heavy work defers.
    Critical,
}

/// Shared handle to the pool. Cheap to clone; all clones see the same
/// free-lists and pressure state.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    state: Mutex<PoolState>,
    warning_bytes: usize,
    critical_bytes: usize,
    events: broadcast::Sender<PressureLevel>,
}

#[derive(Debug)]
struct PoolState {
    compute: Vec<Vec<f32>>,
    bytes: Vec<Vec<u8>>,
    level: PressureLevel,
    current_bytes: usize,
    peak_bytes: usize,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcePool {
    /// Creates a pool with the default pressure thresholds (100/200 MB).
    pub fn new() -> Self {
        Self::with_thresholds(DEFAULT_WARNING_BYTES, DEFAULT_CRITICAL_BYTES)
    }

    /// Creates a pool with explicit thresholds, in bytes.
    pub fn with_thresholds(warning_bytes: usize, critical_bytes: usize) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    compute: Vec::new(),
                    bytes: Vec::new(),
                    level: PressureLevel::Normal,
                    current_bytes: 0,
                    peak_bytes: 0,
                }),
                warning_bytes,
                critical_bytes,
                events,
            }),
        }
    }

    /// Borrows a compute buffer with at least the given capacity.
    pub fn borrow_compute(&self, capacity: usize) -> ComputeBuffer {
        let mut state = self.lock();
        let buf = match state.compute.iter().position(|b| b.capacity() >= capacity) {
            Some(pos) => {
                let mut buf = state.compute.swap_remove(pos);
                buf.clear();
                buf
            }
            None => {
                let buf: Vec<f32> = Vec::with_capacity(capacity);
                state.current_bytes += buf.capacity() * std::mem::size_of::<f32>();
                state.peak_bytes = state.peak_bytes.max(state.current_bytes);
                self.reclassify_locked(&mut state);
                buf
            }
        };
        drop(state);
        ComputeBuffer {
            buf: Some(buf),
            pool: self.clone(),
        }
    }

    /// Borrows a byte buffer with at least the given capacity.
    pub fn borrow_bytes(&self, capacity: usize) -> ByteBuffer {
        let mut state = self.lock();
        let buf = match state.bytes.iter().position(|b| b.capacity() >= capacity) {
            Some(pos) => {
                let mut buf = state.bytes.swap_remove(pos);
                buf.clear();
                buf
            }
            None => {
                let buf: Vec<u8> = Vec::with_capacity(capacity);
                state.current_bytes += buf.capacity();
                state.peak_bytes = state.peak_bytes.max(state.current_bytes);
                self.reclassify_locked(&mut state);
                buf
            }
        };
        drop(state);
        ByteBuffer {
            buf: Some(buf),
            pool: self.clone(),
        }
    }

    fn release_compute(&self, buf: Vec<f32>) {
        let mut state = self.lock();
        if state.level == PressureLevel::Critical || state.compute.len() >= MAX_POOL_ENTRIES {
            state.current_bytes = state
                .current_bytes
                .saturating_sub(buf.capacity() * std::mem::size_of::<f32>());
        } else {
            state.compute.push(buf);
        }
        self.reclassify_locked(&mut state);
    }

    fn release_bytes(&self, buf: Vec<u8>) {
        let mut state = self.lock();
        if state.level == PressureLevel::Critical || state.bytes.len() >= MAX_POOL_ENTRIES {
            state.current_bytes = state.current_bytes.saturating_sub(buf.capacity());
        } else {
            state.bytes.push(buf);
        }
        self.reclassify_locked(&mut state);
    }

    /// Resident bytes currently attributed to the pool (pooled + lent).
    pub fn current_usage_bytes(&self) -> usize {
        self.lock().current_bytes
    }

    /// High-water mark of resident bytes.
    pub fn peak_usage_bytes(&self) -> usize {
        self.lock().peak_bytes
    }

    /// Current pressure classification.
    pub fn pressure_level(&self) -> PressureLevel {
        self.lock().level
    }

    /// Number of entries sitting in each free-list (compute, bytes).
    pub fn pooled_entries(&self) -> (usize, usize) {
        let state = self.lock();
        (state.compute.len(), state.bytes.len())
    }

    /// Subscribes to pressure-level transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<PressureLevel> {
        self.inner.events.subscribe()
    }

    /// True only at critical pressure.
    pub fn should_defer_heavy_operation(&self) -> bool {
        self.pressure_level() == PressureLevel::Critical
    }

    /// Batch width adapted to pressure: halved at warning, quartered at
    /// critical, never below one.
    pub fn recommended_batch_size(&self, base: usize) -> usize {
        match self.pressure_level() {
            PressureLevel::Normal => base.max(1),
            PressureLevel::Warning => (base / 2).max(1),
            PressureLevel::Critical => (base / 4).max(1),
        }
    }

    /// Re-evaluates the pressure level now. Borrow and release already
    /// reclassify; this is the hook for the polling monitor.
    pub fn poll_pressure(&self) -> PressureLevel {
        let mut state = self.lock();
        self.reclassify_locked(&mut state);
        state.level
    }

    /// Spawns a task re-evaluating pressure on a fixed interval. Runs
    /// until the returned handle is aborted.
    pub fn spawn_monitor(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let pool = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                pool.poll_pressure();
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        // A poisoned pool mutex means a panic mid-bookkeeping; the
        // free-lists are still structurally valid, so keep serving.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Level transition handler. Runs under the free-list lock so a
    /// clear-all can never race a concurrent borrow.
    fn reclassify_locked(&self, state: &mut PoolState) {
        let new_level = if state.current_bytes >= self.inner.critical_bytes {
            PressureLevel::Critical
        } else if state.current_bytes >= self.inner.warning_bytes {
            PressureLevel::Warning
        } else {
            PressureLevel::Normal
        };
        if new_level == state.level {
            return;
        }

        let old_level = state.level;
        state.level = new_level;
        match new_level {
            PressureLevel::Critical => {
                let freed: usize = state
                    .compute
                    .drain(..)
                    .map(|b| b.capacity() * std::mem::size_of::<f32>())
                    .chain(state.bytes.drain(..).map(|b| b.capacity()))
                    .sum();
                state.current_bytes = state.current_bytes.saturating_sub(freed);
                warn!(
                    resident_bytes = state.current_bytes,
                    freed_bytes = freed,
                    "memory pressure critical, pools cleared"
                );
            }
            PressureLevel::Warning if new_level > old_level => {
                let mut freed = 0usize;
                while state.compute.len() > SHRINK_FLOOR {
                    freed += state.compute.swap_remove(0).capacity() * std::mem::size_of::<f32>();
                }
                while state.bytes.len() > SHRINK_FLOOR {
                    freed += state.bytes.swap_remove(0).capacity();
                }
                state.current_bytes = state.current_bytes.saturating_sub(freed);
                warn!(
                    resident_bytes = state.current_bytes,
                    freed_bytes = freed,
                    "memory pressure warning, pools shrunk"
                );
            }
            _ => {
                info!(resident_bytes = state.current_bytes, ?new_level, "memory pressure eased");
            }
        }

        // No receivers is fine; the event is advisory.
        let _ = self.inner.events.send(new_level);
        debug!(?old_level, ?new_level, "pressure transition");
    }
}

/// RAII guard for a borrowed compute buffer.
#[derive(Debug)]
pub struct ComputeBuffer {
    buf: Option<Vec<f32>>,
    pool: ResourcePool,
}

impl Deref for ComputeBuffer {
    type Target = Vec<f32>;

    fn deref(&self) -> &Vec<f32> {
        self.buf.as_ref().expect("buffer taken")
    }
}

impl DerefMut for ComputeBuffer {
    fn deref_mut(&mut self) -> &mut Vec<f32> {
        self.buf.as_mut().expect("buffer taken")
    }
}

impl Drop for ComputeBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release_compute(buf);
        }
    }
}

/// RAII guard for a borrowed byte buffer.
#[derive(Debug)]
pub struct ByteBuffer {
    buf: Option<Vec<u8>>,
    pool: ResourcePool,
}

impl Deref for ByteBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        self.buf.as_ref().expect("buffer taken")
    }
}

impl DerefMut for ByteBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buf.as_mut().expect("buffer taken")
    }
}

impl Drop for ByteBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release_bytes(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borrow_returns_on_drop() {
        let pool = ResourcePool::new();
        assert_eq!(pool.pooled_entries(), (0, 0));

        {
            let mut buf = pool.borrow_bytes(128);
            buf.push(7);
            assert_eq!(pool.pooled_entries(), (0, 0));
        }
        assert_eq!(pool.pooled_entries(), (0, 1));

        // The pooled buffer is reused and handed back cleared.
        let buf = pool.borrow_bytes(64);
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 128);
        assert_eq!(pool.pooled_entries(), (0, 0));
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = ResourcePool::new();
        let guards: Vec<_> = (0..MAX_POOL_ENTRIES + 5)
            .map(|_| pool.borrow_bytes(16))
            .collect();
        drop(guards);
        let (_, byte_entries) = pool.pooled_entries();
        assert_eq!(byte_entries, MAX_POOL_ENTRIES);
    }

    #[test]
    fn test_usage_accounting() {
        let pool = ResourcePool::new();
        let buf = pool.borrow_compute(1000);
        assert!(pool.current_usage_bytes() >= 4000);
        drop(buf);
        // Still resident: the buffer went back to the free-list.
        assert!(pool.current_usage_bytes() >= 4000);
        assert!(pool.peak_usage_bytes() >= 4000);
    }

    #[test]
    fn test_pressure_transitions_and_events() {
        let pool = ResourcePool::with_thresholds(1024, 4096);
        let mut events = pool.subscribe();
        assert_eq!(pool.pressure_level(), PressureLevel::Normal);

        let warning_buf = pool.borrow_bytes(2048);
        assert_eq!(pool.pressure_level(), PressureLevel::Warning);
        assert!(!pool.should_defer_heavy_operation());
        assert_eq!(events.try_recv().unwrap(), PressureLevel::Warning);

        let critical_buf = pool.borrow_bytes(4096);
        assert_eq!(pool.pressure_level(), PressureLevel::Critical);
        assert!(pool.should_defer_heavy_operation());
        assert_eq!(events.try_recv().unwrap(), PressureLevel::Critical);

        // At critical both free-lists are empty and returns are dropped.
        assert_eq!(pool.pooled_entries(), (0, 0));
        drop(warning_buf);
        drop(critical_buf);
        assert_eq!(pool.pooled_entries(), (0, 0));
        assert_eq!(pool.pressure_level(), PressureLevel::Normal);
    }

    #[test]
    fn test_recommended_batch_size() {
        let pool = ResourcePool::with_thresholds(1024, 4096);
        assert_eq!(pool.recommended_batch_size(8), 8);

        let _warning = pool.borrow_bytes(2048);
        assert_eq!(pool.recommended_batch_size(8), 4);
        assert_eq!(pool.recommended_batch_size(1), 1);

        let _critical = pool.borrow_bytes(4096);
        assert_eq!(pool.recommended_batch_size(8), 2);
        assert_eq!(pool.recommended_batch_size(2), 1);
    }

    #[test]
    fn test_buffer_returned_on_unwind() {
        let pool = ResourcePool::new();
        let cloned = pool.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _buf = cloned.borrow_bytes(256);
            panic!("unwind with a buffer checked out");
        }));
        assert!(result.is_err());
        assert_eq!(pool.pooled_entries(), (0, 1));
    }
}
