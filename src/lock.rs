//! Critical-section capabilities the heap can be built with.
//!
//! A [`Heap`](crate::Heap) holds its state behind a [`lock_api::Mutex`], so any
//! [`RawMutex`] works as the critical section: a spin lock, an interrupt mask
//! on a single core, or the host's own primitive.

use core::cell::Cell;

use lock_api::{GuardNoSend, RawMutex};

/// Spin lock used by default. Makes the heap `Sync`.
pub type SpinRawMutex = spin::Mutex<()>;

/// Lock for strictly single-threaded hosts.
///
/// It never waits: it only records that the heap is in use, so a heap built
/// on it is `!Sync` and cannot be shared across threads. Re-entering the heap
/// while it is held (from an interrupt handler, say) is a caller error and
/// panics instead of handing out two views of the same state.
#[derive(Debug)]
pub struct LocalRawMutex {
  locked: Cell<bool>,
}

unsafe impl RawMutex for LocalRawMutex {
  #[allow(clippy::declare_interior_mutable_const)]
  const INIT: Self = Self {
    locked: Cell::new(false),
  };

  type GuardMarker = GuardNoSend;

  fn lock(&self) {
    assert!(!self.locked.replace(true), "re-entrant heap access");
  }

  fn try_lock(&self) -> bool {
    !self.locked.replace(true)
  }

  unsafe fn unlock(&self) {
    self.locked.set(false);
  }

  fn is_locked(&self) -> bool {
    self.locked.get()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_try_lock_is_exclusive() {
    let raw = LocalRawMutex::INIT;

    assert!(raw.try_lock());
    assert!(raw.is_locked());
    assert!(!raw.try_lock());

    unsafe { raw.unlock() };

    assert!(!raw.is_locked());
    assert!(raw.try_lock());
  }

  #[test]
  #[should_panic(expected = "re-entrant heap access")]
  fn test_lock_twice_panics() {
    let raw = LocalRawMutex::INIT;

    raw.lock();
    raw.lock();
  }

  #[test]
  fn test_guard_releases_on_drop() {
    let mutex = lock_api::Mutex::<LocalRawMutex, u32>::new(7);

    {
      let mut guard = mutex.lock();
      *guard += 1;
      assert!(mutex.is_locked());
    }

    assert!(!mutex.is_locked());
    assert_eq!(*mutex.lock(), 8);
  }
}
