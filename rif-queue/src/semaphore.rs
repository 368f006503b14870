//! Counting semaphore on a parking_lot mutex and condvar.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub(crate) fn post(&self) {
        *self.permits.lock() += 1;
        self.available.notify_one();
    }

    pub(crate) fn wait(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    pub(crate) fn try_wait(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Returns `false` once `deadline` passes without a permit.
    pub(crate) fn wait_until(&self, deadline: Instant) -> bool {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            if self.available.wait_until(&mut permits, deadline).timed_out() && *permits == 0 {
                return false;
            }
        }
        *permits -= 1;
        true
    }

    #[cfg(test)]
    pub(crate) fn permits(&self) -> usize {
        *self.permits.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_permits_are_counted() {
        let semaphore = Semaphore::default();
        assert!(!semaphore.try_wait());
        semaphore.post();
        semaphore.post();
        assert_eq!(semaphore.permits(), 2);
        semaphore.wait();
        assert!(semaphore.try_wait());
        assert!(!semaphore.try_wait());
    }

    #[test]
    fn test_wait_until_times_out() {
        let semaphore = Semaphore::default();
        let deadline = Instant::now() + Duration::from_millis(20);
        assert!(!semaphore.wait_until(deadline));
        assert!(Instant::now() >= deadline);
    }
}
