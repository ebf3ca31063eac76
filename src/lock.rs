// src/lock.rs

use std::sync::{Mutex, MutexGuard};

/// Acquire mutex guard, ignoring poisoning.
///
/// None of the guarded state in this crate can be left half-updated by a
/// panic, so a poisoned lock is still safe to use.
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
