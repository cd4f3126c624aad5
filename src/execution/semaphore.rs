use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Blocking counting semaphore bounding how many row chunks are filtered at once.
///
/// Permits are returned when the [`Permit`] guard drops, so a panicking predicate cannot leak
/// one.
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

/// One acquired permit; released on drop.
pub(crate) struct Permit<'a> {
    sem: &'a Semaphore,
    /// Time spent blocked before the permit was granted.
    pub waited: Duration,
}

impl Semaphore {
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits.max(1)),
            cv: Condvar::new(),
        }
    }

    pub(crate) fn acquire(&self) -> Permit<'_> {
        let start = Instant::now();
        let mut blocked = false;
        let mut free = self.lock();
        while *free == 0 {
            blocked = true;
            free = self.cv.wait(free).unwrap_or_else(PoisonError::into_inner);
        }
        *free -= 1;
        Permit {
            sem: self,
            waited: if blocked { start.elapsed() } else { Duration::ZERO },
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // The counter stays consistent even if a holder panicked.
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.sem.lock() += 1;
        self.sem.cv.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::Semaphore;
    use std::time::Duration;

    #[test]
    fn permits_return_on_drop() {
        let sem = Semaphore::new(1);
        {
            let permit = sem.acquire();
            assert_eq!(permit.waited, Duration::ZERO);
        }
        let again = sem.acquire();
        assert_eq!(again.waited, Duration::ZERO);
    }

    #[test]
    fn zero_permits_is_clamped_to_one() {
        let sem = Semaphore::new(0);
        let _permit = sem.acquire();
    }
}
