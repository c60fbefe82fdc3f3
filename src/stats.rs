use core::fmt;

/// Snapshot of the block chain, taken in one traversal.
///
/// At any point where no operation is in flight,
/// `free_bytes + used_bytes + overhead() == region_size`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Bytes handed to `init`.
  pub region_size: usize,
  /// Bytes taken by one block header.
  pub header_size: usize,
  /// Blocks in the chain, free or used.
  pub blocks: usize,
  pub free_blocks: usize,
  /// Payload bytes of free blocks.
  pub free_bytes: usize,
  /// Payload bytes of used blocks, including rounding slack.
  pub used_bytes: usize,
  /// Payload of the largest free block. Requests are rounded up to the
  /// heap alignment first, so a request of exactly this size can still fail
  /// when the payload is not a multiple of it.
  pub largest_free: usize,
}

impl HeapStats {
  /// Bytes spent on headers.
  pub const fn overhead(&self) -> usize {
    self.blocks * self.header_size
  }

  pub const fn used_blocks(&self) -> usize {
    self.blocks - self.free_blocks
  }
}

impl fmt::Display for HeapStats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "{} bytes: {} used in {} blocks, {} free in {} blocks (largest {}), {} in headers",
      self.region_size,
      self.used_bytes,
      self.used_blocks(),
      self.free_bytes,
      self.free_blocks,
      self.largest_free,
      self.overhead(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    let stats = HeapStats {
      region_size: 256,
      header_size: 24,
      blocks: 3,
      free_blocks: 1,
      free_bytes: 128,
      used_bytes: 56,
      largest_free: 128,
    };

    assert_eq!(stats.overhead(), 72);
    assert_eq!(stats.used_blocks(), 2);
    assert_eq!(
      stats.to_string(),
      "256 bytes: 56 used in 2 blocks, 128 free in 1 blocks (largest 128), 72 in headers"
    );
  }
}
