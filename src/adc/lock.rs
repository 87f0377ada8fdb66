//! Non-reentrant per instance lock
//!
//! Held by every state mutating operation of an [`Adc`](`super::Adc`). A
//! second acquisition while held fails with [`Error::Busy`] instead of
//! blocking, there is nobody else who could release it.

use core::sync::atomic::{AtomicBool, Ordering};

use super::Error;

#[derive(Debug, Default)]
pub(crate) struct Lock {
    locked: AtomicBool,
}

impl Lock {
    pub(crate) const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    pub(crate) fn try_acquire(&self) -> Result<(), Error> {
        if self.locked.swap(true, Ordering::Acquire) {
            Err(Error::Busy)
        } else {
            Ok(())
        }
    }

    pub(crate) fn release(&self) {
        self.locked.store(false, Ordering::Release);
    }

    #[cfg(test)]
    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_busy() {
        let lock = Lock::new();
        assert_eq!(lock.try_acquire(), Ok(()));
        assert_eq!(lock.try_acquire(), Err(Error::Busy));
        assert!(lock.is_locked());
    }

    #[test]
    fn release_allows_reacquire() {
        let lock = Lock::new();
        lock.try_acquire().unwrap();
        lock.release();
        assert!(!lock.is_locked());
        assert_eq!(lock.try_acquire(), Ok(()));
    }
}
