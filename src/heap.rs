use core::{
  alloc::{GlobalAlloc, Layout},
  marker::PhantomData,
  ptr::{self, NonNull},
};

use cfg_if::cfg_if;
use lock_api::{Mutex, RawMutex};
use tracing::warn;

use crate::{
  error::AllocResult,
  lock::SpinRawMutex,
  state::HeapState,
  stats::HeapStats,
};

/// Payload alignment used when none is given.
pub const DEFAULT_ALIGNMENT: usize = 8;

/// A first-fit heap over a single caller-supplied region.
///
/// - `'a` is how long the region is borrowed for.
/// - `R` is the critical section every operation runs in.
/// - `ALIGN` is the payload alignment, a power of two.
///
/// The heap starts unconfigured; [`Heap::init`] hands it its memory exactly
/// once. Since [`Heap::new`] is a `const fn`, a process-wide heap is just a
/// `static`.
///
/// ```rust
/// use rheap::Heap;
///
/// #[repr(align(8))]
/// struct Region([u8; 256]);
///
/// let mut region = Region([0; 256]);
/// let heap: Heap = Heap::new();
/// heap.init(&mut region.0).unwrap();
///
/// let ptr = heap.allocate(32).unwrap();
/// assert_eq!(ptr.as_ptr() as usize % 8, 0);
/// heap.release(ptr.as_ptr()).unwrap();
///
/// assert_eq!(heap.free_bytes(), Ok(256 - <Heap>::HEADER_SIZE));
/// ```
#[derive(Debug)]
pub struct Heap<'a, R: RawMutex = SpinRawMutex, const ALIGN: usize = DEFAULT_ALIGNMENT> {
  state: Mutex<R, HeapState<ALIGN>>,
  region: PhantomData<&'a mut [u8]>,
}

impl<'a, R: RawMutex, const ALIGN: usize> Heap<'a, R, ALIGN> {
  /// Alignment of every payload pointer.
  pub const ALIGNMENT: usize = ALIGN;

  /// Bytes of bookkeeping in front of every block.
  pub const HEADER_SIZE: usize = HeapState::<ALIGN>::HEADER;

  pub const fn new() -> Self {
    Self {
      state: Mutex::new(HeapState::new()),
      region: PhantomData,
    }
  }

  /// Hands `region` to the heap for as long as the heap lives.
  ///
  /// See [`Heap::init_raw`] for the ways this can fail.
  pub fn init(
    &self,
    region: &'a mut [u8],
  ) -> AllocResult<()> {
    // SAFETY: the exclusive borrow keeps the region valid and untouched for
    // `'a`, which the heap cannot outlive.
    unsafe { self.init_raw(region.as_mut_ptr(), region.len()) }
  }
}

cfg_if! {
  if #[cfg(feature = "enabled")] {
    impl<R: RawMutex, const ALIGN: usize> Heap<'_, R, ALIGN> {
      /// Hands `size` bytes at `start` to the heap and lays down a single
      /// free block covering them.
      ///
      /// Fails without touching anything if `start` is null or not aligned to
      /// `ALIGN`, if `size` does not exceed one header, or if the region would
      /// wrap the address space. A second call fails with
      /// [`AllocError::AlreadyInitialized`](crate::AllocError::AlreadyInitialized)
      /// and leaves the first region in place.
      ///
      /// # Safety
      ///
      /// `start .. start + size` must be valid for reads and writes and must
      /// not be accessed other than through this heap's payload pointers for
      /// the rest of the heap's life.
      pub unsafe fn init_raw(
        &self,
        start: *mut u8,
        size: usize,
      ) -> AllocResult<()> {
        unsafe { self.state.lock().init(start, size) }
      }

      pub fn is_initialized(&self) -> bool {
        self.state.lock().is_initialized()
      }

      /// Returns a pointer to at least `size` bytes aligned to `ALIGN`.
      ///
      /// The request is rounded up to the alignment and served from the
      /// lowest free block that fits, splitting it when the rest can hold
      /// another block.
      pub fn allocate(
        &self,
        size: usize,
      ) -> AllocResult<NonNull<u8>> {
        self.state.lock().allocate(size)
      }

      /// Gives back a pointer returned by [`Heap::allocate`] and merges its
      /// block with free neighbours.
      ///
      /// Pointers that are null, outside the region, not the exact start of
      /// a payload, or already released are rejected without any change.
      pub fn release(
        &self,
        ptr: *mut u8,
      ) -> AllocResult<()> {
        self.state.lock().release(ptr)
      }

      /// Total payload bytes of all free blocks.
      ///
      /// Free space may be split across blocks; see
      /// [`HeapStats::largest_free`] for the largest single payload.
      pub fn free_bytes(&self) -> AllocResult<usize> {
        self.state.lock().free_bytes()
      }

      pub fn stats(&self) -> AllocResult<HeapStats> {
        self.state.lock().stats()
      }

      /// Audits the block chain, returning
      /// [`AllocError::Corrupted`](crate::AllocError::Corrupted) with the
      /// offset of the first bad header.
      pub fn check(&self) -> AllocResult<()> {
        self.state.lock().check()
      }
    }
  } else {
    use crate::error::AllocError;

    impl<R: RawMutex, const ALIGN: usize> Heap<'_, R, ALIGN> {
      /// Disabled at build time: always fails with [`AllocError::Disabled`].
      ///
      /// # Safety
      ///
      /// None required; nothing is touched.
      pub unsafe fn init_raw(
        &self,
        _start: *mut u8,
        _size: usize,
      ) -> AllocResult<()> {
        Err(AllocError::Disabled)
      }

      pub fn is_initialized(&self) -> bool {
        false
      }

      pub fn allocate(
        &self,
        _size: usize,
      ) -> AllocResult<NonNull<u8>> {
        Err(AllocError::Disabled)
      }

      pub fn release(
        &self,
        _ptr: *mut u8,
      ) -> AllocResult<()> {
        Err(AllocError::Disabled)
      }

      pub fn free_bytes(&self) -> AllocResult<usize> {
        Err(AllocError::Disabled)
      }

      pub fn stats(&self) -> AllocResult<HeapStats> {
        Err(AllocError::Disabled)
      }

      pub fn check(&self) -> AllocResult<()> {
        Err(AllocError::Disabled)
      }
    }
  }
}

impl<R: RawMutex, const ALIGN: usize> Default for Heap<'_, R, ALIGN> {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl<R: RawMutex, const ALIGN: usize> GlobalAlloc for Heap<'_, R, ALIGN> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > ALIGN {
      return ptr::null_mut();
    }

    self.allocate(layout.size()).map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
  ) {
    if let Err(err) = self.release(ptr) {
      warn!(target: "rheap", %err, size = layout.size(), "dealloc failed");
    }
  }
}

#[cfg(all(test, feature = "enabled"))]
mod tests {
  use core::mem;
  use std::thread;

  use super::*;
  use crate::{
    error::AllocError,
    lock::LocalRawMutex,
    status::{ErrorClass, Severity, Status, code},
    test_utils::{Arena, init_tracing},
  };

  const HEADER: usize = <Heap<'static>>::HEADER_SIZE;

  #[test]
  fn test_init_reports_region_minus_header() {
    init_tracing();
    let mut arena = Arena::<128>::new();
    let heap: Heap = Heap::new();

    assert!(!heap.is_initialized());
    assert_eq!(heap.init(arena.as_mut_slice()), Ok(()));
    assert!(heap.is_initialized());
    assert_eq!(heap.free_bytes(), Ok(128 - HEADER));
  }

  #[test]
  fn test_alloc() {
    init_tracing();
    let mut arena = Arena::<512>::new();
    let heap: Heap = Heap::new();
    heap.init(arena.as_mut_slice()).unwrap();

    let first = heap.allocate(16).unwrap().as_ptr() as usize;
    let second = heap.allocate(32).unwrap().as_ptr() as usize;

    assert_ne!(first, second);
    assert_eq!(first % 8, 0);
    assert_eq!(second % 8, 0);
    assert!(first + 16 <= second || second + 32 <= first);

    let oversize = heap.allocate(1024);
    assert_eq!(
      oversize,
      Err(AllocError::TooLarge {
        requested: 1024,
        capacity: 512 - HEADER
      })
    );

    let status = Status::from(oversize);
    assert_eq!(status.severity(), Some(Severity::Error));
    assert_eq!(status.code(), code::NO_MEMORY);
  }

  #[test]
  fn test_double_free() {
    let mut arena = Arena::<256>::new();
    let heap: Heap = Heap::new();
    heap.init(arena.as_mut_slice()).unwrap();

    let ptr = heap.allocate(32).unwrap().as_ptr();

    assert_eq!(heap.release(ptr), Ok(()));

    let err = heap.release(ptr).unwrap_err();
    assert_eq!(err, AllocError::DoubleFree { addr: ptr as usize });
    assert_eq!(err.status().class(), Some(ErrorClass::Memory));
    assert_eq!(err.status().code(), code::DOUBLE_FREE);
  }

  #[test]
  fn test_linked_list_of_ten_nodes() {
    #[repr(C)]
    struct Node {
      value: i32,
      next: *mut Node,
    }

    let mut arena = Arena::<1024>::new();
    let heap: Heap = Heap::new();
    heap.init(arena.as_mut_slice()).unwrap();

    let mut head: *mut Node = ptr::null_mut();
    for value in 0..10 {
      let node = heap.allocate(mem::size_of::<Node>()).unwrap().cast::<Node>();
      unsafe { node.as_ptr().write(Node { value, next: head }) };
      head = node.as_ptr();
    }

    unsafe {
      let mut expected = 9;
      let mut iter = head;
      while !iter.is_null() {
        assert_eq!((*iter).value, expected);
        expected -= 1;
        iter = (*iter).next;
      }
      assert_eq!(expected, -1);

      let mut iter = head;
      while !iter.is_null() {
        let next = (*iter).next;
        assert_eq!(heap.release(iter.cast()), Ok(()));
        iter = next;
      }
    }

    assert_eq!(heap.free_bytes(), Ok(1024 - HEADER));
  }

  #[test]
  fn test_adjacent_blocks_coalesce() {
    let mut arena = Arena::<128>::new();
    let heap: Heap = Heap::new();
    heap.init(arena.as_mut_slice()).unwrap();

    let first = heap.allocate(16).unwrap();
    let second = heap.allocate(16).unwrap();

    heap.release(first.as_ptr()).unwrap();
    heap.release(second.as_ptr()).unwrap();

    assert_eq!(heap.free_bytes(), Ok(128 - HEADER));
    assert_eq!(heap.stats().unwrap().blocks, 1);
    assert!(heap.allocate(128 - HEADER).is_ok());
  }

  #[test]
  fn test_operations_before_init_fail() {
    let heap: Heap = Heap::new();
    let mut byte = 0u8;

    assert_eq!(heap.allocate(16), Err(AllocError::NotInitialized));
    assert_eq!(heap.release(&mut byte), Err(AllocError::NotInitialized));
    assert_eq!(heap.free_bytes(), Err(AllocError::NotInitialized));

    let status = Status::from(heap.allocate(16));
    assert_eq!(status.code(), code::NOT_INITIALIZED);
  }

  #[test]
  fn test_second_init_warns_and_keeps_state() {
    let mut arena = Arena::<256>::new();
    let mut other = Arena::<512>::new();
    let heap: Heap = Heap::new();
    heap.init(arena.as_mut_slice()).unwrap();
    let ptr = heap.allocate(64).unwrap();

    let err = heap.init(other.as_mut_slice()).unwrap_err();
    assert_eq!(err, AllocError::AlreadyInitialized);
    assert_eq!(err.status().severity(), Some(Severity::Warning));

    assert_eq!(heap.stats().unwrap().region_size, 256);
    assert_eq!(heap.release(ptr.as_ptr()), Ok(()));
    assert_eq!(heap.free_bytes(), Ok(256 - HEADER));
  }

  #[test]
  fn test_misaligned_region_is_rejected() {
    let mut arena = Arena::<128>::new();
    let heap: Heap = Heap::new();

    let region = arena.as_mut_slice();
    let err = heap.init(&mut region[1..]).unwrap_err();
    assert!(matches!(err, AllocError::Misaligned { align: 8, .. }));
    assert_eq!(err.status().code(), code::ALIGNMENT);
    assert!(!heap.is_initialized());
  }

  #[test]
  fn test_wider_alignment() {
    let mut arena = Arena::<1024>::new();
    let heap: Heap<'_, SpinRawMutex, 32> = Heap::new();
    heap.init(arena.as_mut_slice()).unwrap();

    assert_eq!(Heap::<'_, SpinRawMutex, 32>::HEADER_SIZE % 32, 0);
    for size in [1, 7, 33, 64, 5] {
      let ptr = heap.allocate(size).unwrap();
      assert_eq!(ptr.as_ptr() as usize % 32, 0);
    }
    assert_eq!(heap.check(), Ok(()));
  }

  #[test]
  fn test_single_threaded_lock() {
    let mut arena = Arena::<256>::new();
    let heap: Heap<'_, LocalRawMutex> = Heap::new();
    heap.init(arena.as_mut_slice()).unwrap();

    let ptr = heap.allocate(24).unwrap();
    assert_eq!(heap.stats().unwrap().used_bytes, 24);
    assert_eq!(heap.release(ptr.as_ptr()), Ok(()));
    assert_eq!(heap.check(), Ok(()));
  }

  #[test]
  fn test_global_alloc_interface() {
    let mut arena = Arena::<512>::new();
    let heap: Heap = Heap::new();
    heap.init(arena.as_mut_slice()).unwrap();

    unsafe {
      let layout = Layout::new::<u64>();
      let ptr = heap.alloc(layout).cast::<u64>();
      assert!(!ptr.is_null());
      ptr.write(0x1122_3344_5566_7788);
      assert_eq!(ptr.read(), 0x1122_3344_5566_7788);

      let wide = Layout::from_size_align(64, 64).unwrap();
      assert!(heap.alloc(wide).is_null());

      heap.dealloc(ptr.cast(), layout);
      // A bad pointer is logged, not propagated.
      heap.dealloc(ptr.cast(), layout);
    }

    assert_eq!(heap.free_bytes(), Ok(512 - HEADER));
  }

  #[test]
  fn test_shared_between_threads() {
    const SIZE: usize = 16 * 1024;
    let mut arena = Arena::<SIZE>::new();
    let heap: Heap = Heap::new();
    heap.init(arena.as_mut_slice()).unwrap();

    thread::scope(|scope| {
      for worker in 0..4u8 {
        let heap = &heap;
        scope.spawn(move || {
          for round in 0..100usize {
            let size = 8 + (round % 7) * 8;
            let ptr = heap.allocate(size).unwrap();
            unsafe { ptr.as_ptr().write_bytes(worker, size) };
            assert!(
              (0..size).all(|i| unsafe { ptr.as_ptr().add(i).read() } == worker)
            );
            heap.release(ptr.as_ptr()).unwrap();
          }
        });
      }
    });

    assert_eq!(heap.check(), Ok(()));
    assert_eq!(heap.free_bytes(), Ok(SIZE - HEADER));
  }
}
