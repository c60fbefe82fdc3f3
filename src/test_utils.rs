use core::cell::UnsafeCell;

/// Over-aligned backing memory for heaps under test.
///
/// The bytes sit in an `UnsafeCell` so handing the heap a pointer does not
/// require holding a `&mut` to the arena.
#[repr(C, align(64))]
pub(crate) struct Arena<const N: usize>(UnsafeCell<[u8; N]>);

impl<const N: usize> Arena<N> {
  pub(crate) const fn new() -> Self {
    Self(UnsafeCell::new([0; N]))
  }

  pub(crate) const fn as_mut_ptr(&self) -> *mut u8 {
    self.0.get().cast()
  }

  pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
    self.0.get_mut()
  }
}

/// Routes heap events to the test harness output.
pub(crate) fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::TRACE)
    .with_test_writer()
    .try_init();
}
