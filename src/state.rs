//! The block chain and the algorithms that walk it.
//!
//! Everything here runs with the heap lock held; [`Heap`](crate::Heap) is the
//! only caller.

use core::ptr::NonNull;

use tracing::{debug, trace, warn};

use crate::{
  align::is_aligned,
  align_to,
  block::Block,
  error::{AllocError, AllocResult},
  stats::HeapStats,
};

/// The caller's memory, as handed to `init`.
#[derive(Debug)]
struct Region {
  base: NonNull<u8>,
  size: usize,
  head: usize,
}

impl Region {
  fn start(&self) -> usize {
    self.base.as_ptr() as usize
  }

  /// Decodes the header at `offset`, refusing offsets whose header would not
  /// fit in the region.
  fn read(
    &self,
    offset: usize,
  ) -> AllocResult<Block> {
    let in_bounds = offset
      .checked_add(Block::ENCODED_SIZE)
      .is_some_and(|end| end <= self.size);
    if !in_bounds {
      return Err(AllocError::Corrupted { offset });
    }

    // SAFETY: the header lies inside the region, which `init_raw` required
    // to be valid for reads for as long as the heap lives.
    unsafe { Block::load(self.base, offset) }.ok_or(AllocError::Corrupted { offset })
  }

  fn write(
    &self,
    offset: usize,
    block: Block,
  ) {
    debug_assert!(offset + Block::ENCODED_SIZE <= self.size);

    // SAFETY: callers only write at offsets of blocks in the chain or at a
    // split point checked against the region end, never inside a live payload.
    unsafe { block.store(self.base, offset) }
  }

  fn chain(&self) -> Chain<'_> {
    Chain {
      region: self,
      cursor: Some(self.head),
    }
  }
}

/// Address-ordered walk over the blocks of a region.
struct Chain<'r> {
  region: &'r Region,
  cursor: Option<usize>,
}

impl Iterator for Chain<'_> {
  type Item = AllocResult<(usize, Block)>;

  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.cursor.take()?;

    let block = match self.region.read(offset) {
      Ok(block) => block,
      Err(err) => return Some(Err(err)),
    };

    match block.next {
      // Links only ever point forward; anything else would loop.
      Some(next) if next <= offset => return Some(Err(AllocError::Corrupted { offset })),
      next => self.cursor = next,
    }

    Some(Ok((offset, block)))
  }
}

/// Heap State: the region and, through it, the block chain.
#[derive(Debug)]
pub(crate) struct HeapState<const ALIGN: usize> {
  region: Option<Region>,
}

// SAFETY: the region pointer is only dereferenced through `&mut HeapState`
// or `&HeapState` obtained from the heap lock.
unsafe impl<const ALIGN: usize> Send for HeapState<ALIGN> {}

impl<const ALIGN: usize> HeapState<ALIGN> {
  const ALIGN_IS_POWER_OF_TWO: () = assert!(ALIGN.is_power_of_two(), "alignment must be a power of two");

  /// Header size, padded so every payload keeps the block's alignment.
  pub(crate) const HEADER: usize = align_to!(Block::ENCODED_SIZE, ALIGN);

  pub(crate) const fn new() -> Self {
    #[allow(clippy::let_unit_value)]
    let () = Self::ALIGN_IS_POWER_OF_TWO;

    Self { region: None }
  }

  pub(crate) const fn is_initialized(&self) -> bool {
    self.region.is_some()
  }

  fn region(&self) -> AllocResult<&Region> {
    self.region.as_ref().ok_or(AllocError::NotInitialized)
  }

  /// Takes over `size` bytes at `start` and lays down a single free block
  /// covering all of them.
  ///
  /// # Safety
  ///
  /// `start .. start + size` must be valid for reads and writes, untouched by
  /// anything else, for the rest of the heap's life.
  pub(crate) unsafe fn init(
    &mut self,
    start: *mut u8,
    size: usize,
  ) -> AllocResult<()> {
    let base = NonNull::new(start).ok_or(AllocError::NullPointer)?;
    let addr = start as usize;

    if size <= Self::HEADER {
      return Err(AllocError::RegionTooSmall {
        size,
        min: Self::HEADER + 1,
      });
    }
    if !is_aligned(addr, ALIGN) {
      return Err(AllocError::Misaligned { addr, align: ALIGN });
    }
    if addr.checked_add(size).is_none() {
      return Err(AllocError::RegionOverflow { addr, size });
    }
    if self.region.is_some() {
      warn!(target: "rheap", addr, size, "ignoring second heap initialization");
      return Err(AllocError::AlreadyInitialized);
    }

    let region = Region { base, size, head: 0 };
    region.write(region.head, Block::new(size - Self::HEADER, true, None));
    self.region = Some(region);

    debug!(
      target: "rheap",
      addr,
      size,
      header = Self::HEADER,
      align = ALIGN,
      "heap initialized"
    );

    Ok(())
  }

  /// First-fit allocation with in-place split.
  pub(crate) fn allocate(
    &mut self,
    size: usize,
  ) -> AllocResult<NonNull<u8>> {
    let region = self.region()?;

    if size == 0 {
      return Err(AllocError::ZeroSize);
    }
    let capacity = region.size - Self::HEADER;
    if size > capacity {
      return Err(AllocError::TooLarge {
        requested: size,
        capacity,
      });
    }

    // Cannot overflow: `size` is bounded by the region, which fits in the
    // address space.
    let aligned = align_to!(size, ALIGN);

    for item in region.chain() {
      let (offset, mut block) = item?;

      if !block.is_free || block.size < aligned {
        continue;
      }

      let payload = offset + Self::HEADER;
      let end = payload + aligned;
      if end > region.size {
        warn!(target: "rheap", offset, end, "free block runs past the region end, skipping");
        continue;
      }

      if block.size > aligned + Self::HEADER && end + Self::HEADER <= region.size {
        let remainder = Block::new(block.size - aligned - Self::HEADER, true, block.next);
        region.write(end, remainder);

        block.size = aligned;
        block.next = Some(end);

        trace!(target: "rheap", offset, remainder = end, "split block");
      }

      block.is_free = false;
      region.write(offset, block);

      trace!(target: "rheap", offset, requested = size, size = block.size, "allocated");

      // SAFETY: `payload < region.size`, so the pointer stays inside the region.
      return Ok(unsafe { region.base.add(payload) });
    }

    Err(AllocError::OutOfMemory { requested: size })
  }

  /// Marks the block whose payload starts at `ptr` free and merges it with
  /// free neighbours, next first, then previous.
  pub(crate) fn release(
    &mut self,
    ptr: *mut u8,
  ) -> AllocResult<()> {
    if ptr.is_null() {
      return Err(AllocError::NullPointer);
    }

    let region = self.region()?;

    let addr = ptr as usize;
    let start = region.start();
    if addr <= start || addr >= start + region.size {
      return Err(AllocError::OutOfRegion { addr });
    }
    let target = addr - start;

    let mut prev: Option<(usize, Block)> = None;

    for item in region.chain() {
      let (offset, mut block) = item?;
      let payload = offset + Self::HEADER;

      if payload > target {
        break;
      }
      if payload < target {
        prev = Some((offset, block));
        continue;
      }

      if block.is_free {
        return Err(AllocError::DoubleFree { addr });
      }

      let next = match block.next {
        Some(next_offset) => Some((next_offset, region.read(next_offset)?)),
        None => None,
      };

      // Both merged sizes are settled before the first write, so a bad
      // neighbour leaves the chain as it was.
      block.is_free = true;
      let next = next.filter(|(_, next)| next.is_free);
      if let Some((next_offset, next)) = next {
        block.size = Self::merged(block.size, next.size).ok_or(AllocError::Corrupted {
          offset: next_offset,
        })?;
        block.next = next.next;
      }

      let prev = prev.filter(|(_, prev)| prev.is_free);
      let prev = match prev {
        Some((prev_offset, mut prev)) => {
          prev.size = Self::merged(prev.size, block.size).ok_or(AllocError::Corrupted {
            offset: prev_offset,
          })?;
          prev.next = block.next;
          Some((prev_offset, prev))
        }
        None => None,
      };

      region.write(offset, block);
      if let Some((next_offset, _)) = next {
        trace!(target: "rheap", offset, absorbed = next_offset, "coalesced with next");
      }
      if let Some((prev_offset, prev)) = prev {
        region.write(prev_offset, prev);
        trace!(target: "rheap", offset = prev_offset, absorbed = offset, "coalesced with previous");
      }

      trace!(target: "rheap", offset, "released");

      return Ok(());
    }

    Err(AllocError::UnknownPointer { addr })
  }

  /// Payload size of a block that swallows its free neighbour, header
  /// included. `None` only for a corrupted size.
  fn merged(
    size: usize,
    absorbed: usize,
  ) -> Option<usize> {
    size.checked_add(Self::HEADER)?.checked_add(absorbed)
  }

  /// Sum of the payload sizes of all free blocks.
  pub(crate) fn free_bytes(&self) -> AllocResult<usize> {
    self.region()?.chain().try_fold(0usize, |total, item| {
      let (offset, block) = item?;
      if !block.is_free {
        return Ok(total);
      }
      total
        .checked_add(block.size)
        .ok_or(AllocError::Corrupted { offset })
    })
  }

  pub(crate) fn stats(&self) -> AllocResult<HeapStats> {
    let region = self.region()?;
    let mut stats = HeapStats {
      region_size: region.size,
      header_size: Self::HEADER,
      ..HeapStats::default()
    };

    for item in region.chain() {
      let (offset, block) = item?;
      let corrupted = AllocError::Corrupted { offset };

      // Forward-only links keep the block count below the region size.
      stats.blocks += 1;
      if block.is_free {
        stats.free_blocks += 1;
        stats.free_bytes = stats.free_bytes.checked_add(block.size).ok_or(corrupted)?;
        stats.largest_free = stats.largest_free.max(block.size);
      } else {
        stats.used_bytes = stats.used_bytes.checked_add(block.size).ok_or(corrupted)?;
      }
    }

    Ok(stats)
  }

  /// Walks the chain and verifies its structural invariants, reporting the
  /// first block that breaks one.
  pub(crate) fn check(&self) -> AllocResult<()> {
    let region = self.region()?;

    if region.head != 0 {
      return Err(AllocError::Corrupted {
        offset: region.head,
      });
    }

    let mut offset = region.head;
    let mut prev_free = false;

    loop {
      let block = region.read(offset)?;
      let corrupted = AllocError::Corrupted { offset };

      let end = (offset + Self::HEADER)
        .checked_add(block.size)
        .filter(|end| *end <= region.size)
        .ok_or(corrupted)?;

      if prev_free && block.is_free {
        return Err(corrupted);
      }

      match block.next {
        None if end == region.size => return Ok(()),
        Some(next) if next == end => {
          prev_free = block.is_free;
          offset = next;
        }
        _ => return Err(corrupted),
      }
    }
  }
}
