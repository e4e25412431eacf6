//! Writer-preferring reader/writer lock (C1) and the per-library lock
//! registry (C2).
//!
//! Grounded on `app/domain/concurrency/rwlock.py` and `registry.py`: a
//! condition-variable-guarded counter rather than `std::sync::RwLock`,
//! because the standard library's `RwLock` makes no writer-preference
//! guarantee (some platforms starve writers under continuous readers).
//! We use `parking_lot`'s `Mutex`/`Condvar` to stay aligned with the
//! teacher's concurrency primitive of choice instead of `std::sync`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct State {
    readers: u32,
    writer_active: bool,
    writers_waiting: u32,
}

/// A writer-preferring reader/writer lock.
///
/// Concurrent readers are admitted only while no writer is active and no
/// writer is waiting; a waiting writer blocks new readers from entering,
/// preventing writer starvation under a steady stream of readers (§4.1).
pub struct RwLock {
    state: Mutex<State>,
    cond: Condvar,
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl RwLock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                readers: 0,
                writer_active: false,
                writers_waiting: 0,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn acquire_read(&self) {
        let mut s = self.state.lock();
        while s.writer_active || s.writers_waiting > 0 {
            self.cond.wait(&mut s);
        }
        s.readers += 1;
    }

    pub fn release_read(&self) {
        let mut s = self.state.lock();
        s.readers -= 1;
        if s.readers == 0 {
            self.cond.notify_all();
        }
    }

    pub fn acquire_write(&self) {
        let mut s = self.state.lock();
        s.writers_waiting += 1;
        while s.writer_active || s.readers > 0 {
            self.cond.wait(&mut s);
        }
        s.writers_waiting -= 1;
        s.writer_active = true;
    }

    pub fn release_write(&self) {
        let mut s = self.state.lock();
        s.writer_active = false;
        self.cond.notify_all();
    }

    /// Run `f` under the read lock, releasing it on every exit path
    /// (including panics, via `ReadGuard`'s `Drop`).
    pub fn with_read<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.read_guard();
        f()
    }

    /// Run `f` under the write lock, releasing it on every exit path.
    pub fn with_write<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.write_guard();
        f()
    }

    pub fn read_guard(&self) -> ReadGuard<'_> {
        self.acquire_read();
        ReadGuard { lock: self }
    }

    pub fn write_guard(&self) -> WriteGuard<'_> {
        self.acquire_write();
        WriteGuard { lock: self }
    }
}

pub struct ReadGuard<'a> {
    lock: &'a RwLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

pub struct WriteGuard<'a> {
    lock: &'a RwLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

/// Thread-safe registry mapping library id -> [`RwLock`].
///
/// Never removes entries: libraries are few and re-created ids simply
/// reuse the existing (released) lock, a correctness-preserving memory
/// leak bounded by total library count (§4.2).
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<RwLock>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, library_id: &str) -> Arc<RwLock> {
        let mut locks = self.locks.lock();
        locks
            .entry(library_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new()))
            .clone()
    }
}
