//! Wake lock and haptic feedback seams.

/// Platform partial wake lock keeping sensor callbacks alive in the background.
pub trait WakeLock {
    fn acquire(&mut self);
    fn release(&mut self);
    fn is_held(&self) -> bool;
}

/// Holds a wake lock for its lifetime and releases it exactly once, either
/// through [`WakeLockGuard::release`] or on drop.
pub struct WakeLockGuard<W: WakeLock> {
    lock: W,
    released: bool,
}

impl<W: WakeLock> WakeLockGuard<W> {
    pub fn acquire(mut lock: W) -> Self {
        lock.acquire();
        tracing::debug!("wake lock acquired");
        Self {
            lock,
            released: false,
        }
    }

    pub fn is_held(&self) -> bool {
        !self.released && self.lock.is_held()
    }

    /// Release now. Later calls and the eventual drop do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.lock.is_held() {
            self.lock.release();
            tracing::debug!("wake lock released");
        }
    }

    pub fn lock(&self) -> &W {
        &self.lock
    }
}

impl<W: WakeLock> Drop for WakeLockGuard<W> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Wake lock for hosts that do not need one.
#[derive(Debug, Default)]
pub struct NoWakeLock {
    held: bool,
}

impl WakeLock for NoWakeLock {
    fn acquire(&mut self) {
        self.held = true;
    }

    fn release(&mut self) {
        self.held = false;
    }

    fn is_held(&self) -> bool {
        self.held
    }
}

/// Length of the vibration cue when an alert is armed.
pub const ARM_VIBRATION_MS: u64 = 500;

pub trait Haptics {
    fn vibrate(&mut self, duration_ms: u64);
}

#[derive(Debug, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn vibrate(&mut self, _duration_ms: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct CountingLock {
        held: bool,
        releases: Rc<Cell<u32>>,
    }

    impl WakeLock for CountingLock {
        fn acquire(&mut self) {
            self.held = true;
        }
        fn release(&mut self) {
            self.held = false;
            self.releases.set(self.releases.get() + 1);
        }
        fn is_held(&self) -> bool {
            self.held
        }
    }

    #[test]
    fn released_once_on_explicit_release_and_drop() {
        let releases = Rc::new(Cell::new(0));
        let mut guard = WakeLockGuard::acquire(CountingLock {
            held: false,
            releases: releases.clone(),
        });
        assert!(guard.is_held());
        guard.release();
        guard.release();
        drop(guard);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn released_on_drop() {
        let releases = Rc::new(Cell::new(0));
        {
            let _guard = WakeLockGuard::acquire(CountingLock {
                held: false,
                releases: releases.clone(),
            });
        }
        assert_eq!(releases.get(), 1);
    }
}
