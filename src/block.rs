use core::{mem, ptr::NonNull};

const WORD: usize = mem::size_of::<usize>();

/// State word of a free block.
const FREE: usize = 1;
/// State word of a used block.
const USED: usize = 0;
/// Link word of the last block in the chain.
const END_OF_CHAIN: usize = usize::MAX;

/// Block header, decoded from the three machine words stored in front of
/// every payload: `[size][state][next]`.
///
/// `next` is a byte offset from the start of the region, never a pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
  pub size: usize,
  pub is_free: bool,
  pub next: Option<usize>,
}

impl Block {
  /// Bytes taken by the encoded header before alignment padding.
  pub const ENCODED_SIZE: usize = 3 * WORD;

  pub const fn new(
    size: usize,
    is_free: bool,
    next: Option<usize>,
  ) -> Self {
    Self { size, is_free, next }
  }

  pub const fn encode(self) -> [usize; 3] {
    let state = if self.is_free { FREE } else { USED };
    let next = match self.next {
      Some(offset) => offset,
      None => END_OF_CHAIN,
    };

    [self.size, state, next]
  }

  /// Decodes a header, or `None` when the state word is neither free nor used.
  pub const fn decode(words: [usize; 3]) -> Option<Self> {
    let is_free = match words[1] {
      FREE => true,
      USED => false,
      _ => return None,
    };
    let next = match words[2] {
      END_OF_CHAIN => None,
      offset => Some(offset),
    };

    Some(Self::new(words[0], is_free, next))
  }

  /// Reads the header stored at `base + offset`.
  ///
  /// # Safety
  ///
  /// `base + offset .. base + offset + ENCODED_SIZE` must be readable memory
  /// of the region `base` points to.
  pub unsafe fn load(
    base: NonNull<u8>,
    offset: usize,
  ) -> Option<Self> {
    let mut words = [0usize; 3];

    unsafe {
      let header = base.as_ptr().add(offset).cast::<usize>();
      for (i, word) in words.iter_mut().enumerate() {
        *word = header.add(i).read_unaligned();
      }
    }

    Self::decode(words)
  }

  /// Writes this header at `base + offset`.
  ///
  /// # Safety
  ///
  /// `base + offset .. base + offset + ENCODED_SIZE` must be writable memory
  /// of the region `base` points to, not covered by any live payload.
  pub unsafe fn store(
    self,
    base: NonNull<u8>,
    offset: usize,
  ) {
    unsafe {
      let header = base.as_ptr().add(offset).cast::<usize>();
      for (i, word) in self.encode().into_iter().enumerate() {
        header.add(i).write_unaligned(word);
      }
    }
  }
}
