use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};

use parking_lot::lock_api::RawRwLock as RawRwLockApi;
use parking_lot::{Mutex, RawRwLock};

use crate::errors::{DafError, DafResult};

#[derive(Debug, Default)]
struct WriterState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// A read/write lock with the nesting discipline stores require:
///
/// - any number of concurrent readers;
/// - one exclusive writer, which may re-enter its own write lock and may
///   take read locks while writing (`write -> read` nesting);
/// - a thread holding only a read lock may NOT take the write lock
///   (`read -> write` upgrade), because that deadlocks two upgraders;
///   the attempt fails with [`DafError::LockUpgradeForbidden`] instead.
///
/// The lock tracks the owning thread of the write lock and the per-thread
/// read depth to enforce the rules.
pub struct ReentrantRwLock<T> {
    label: String,
    raw: RawRwLock,
    writer: Mutex<WriterState>,
    read_depths: Mutex<HashMap<ThreadId, usize>>,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `raw` plus the re-entrancy
// bookkeeping; a nested read inside a write stays on the writing thread.
unsafe impl<T: Send> Send for ReentrantRwLock<T> {}
unsafe impl<T: Send + Sync> Sync for ReentrantRwLock<T> {}

impl<T> ReentrantRwLock<T> {
    pub fn new(label: impl Into<String>, data: T) -> Self {
        Self {
            label: label.into(),
            raw: RawRwLock::INIT,
            writer: Mutex::new(WriterState::default()),
            read_depths: Mutex::new(HashMap::new()),
            data: UnsafeCell::new(data),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn thread_read_depth(&self, thread: ThreadId) -> usize {
        self.read_depths.lock().get(&thread).copied().unwrap_or(0)
    }

    /// Acquire a shared read guard, blocking while a writer is active.
    /// Re-entering from the thread that holds the write lock succeeds
    /// immediately without touching the underlying lock.
    pub fn read(&self) -> ReentrantReadGuard<'_, T> {
        let me = thread::current().id();
        let nested_in_write = self.writer.lock().owner == Some(me);
        if !nested_in_write {
            self.raw.lock_shared();
            *self.read_depths.lock().entry(me).or_insert(0) += 1;
        }
        ReentrantReadGuard {
            lock: self,
            nested_in_write,
        }
    }

    /// Acquire the exclusive write guard.
    ///
    /// Fails with [`DafError::LockUpgradeForbidden`] when the calling thread
    /// already holds a read lock; nesting is allowed only `write -> read`.
    pub fn write(&self) -> DafResult<ReentrantWriteGuard<'_, T>> {
        let me = thread::current().id();
        {
            let mut state = self.writer.lock();
            if state.owner == Some(me) {
                state.depth += 1;
                return Ok(ReentrantWriteGuard {
                    lock: self,
                    nested: true,
                });
            }
        }
        if self.thread_read_depth(me) > 0 {
            return Err(DafError::LockUpgradeForbidden {
                daf: self.label.clone(),
            });
        }
        self.raw.lock_exclusive();
        {
            let mut state = self.writer.lock();
            state.owner = Some(me);
            state.depth = 1;
        }
        Ok(ReentrantWriteGuard {
            lock: self,
            nested: false,
        })
    }
}

pub struct ReentrantReadGuard<'a, T> {
    lock: &'a ReentrantRwLock<T>,
    nested_in_write: bool,
}

impl<T> Deref for ReentrantReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: either a shared lock is held, or this thread owns the
        // exclusive lock; both exclude concurrent mutation.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReentrantReadGuard<'_, T> {
    fn drop(&mut self) {
        if self.nested_in_write {
            return;
        }
        let me = thread::current().id();
        {
            let mut depths = self.lock.read_depths.lock();
            if let Some(depth) = depths.get_mut(&me) {
                *depth -= 1;
                if *depth == 0 {
                    depths.remove(&me);
                }
            }
        }
        // Safety: this guard took the shared lock in `read`.
        unsafe { self.lock.raw.unlock_shared() };
    }
}

pub struct ReentrantWriteGuard<'a, T> {
    lock: &'a ReentrantRwLock<T>,
    nested: bool,
}

impl<T> Deref for ReentrantWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: this thread owns the exclusive lock.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for ReentrantWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: this thread owns the exclusive lock; nested guards are all
        // on this same thread, so no aliasing mutable access exists.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for ReentrantWriteGuard<'_, T> {
    fn drop(&mut self) {
        if self.nested {
            let mut state = self.lock.writer.lock();
            state.depth -= 1;
            return;
        }
        {
            let mut state = self.lock.writer.lock();
            state.depth -= 1;
            debug_assert_eq!(state.depth, 0);
            state.owner = None;
        }
        // Safety: this guard took the exclusive lock in `write`.
        unsafe { self.lock.raw.unlock_exclusive() };
    }
}
