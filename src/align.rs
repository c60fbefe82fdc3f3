/// Rounds `value` up to the next multiple of `align`.
///
/// `align` must be a power of two. The caller is responsible for `value`
/// staying at least `align - 1` below `usize::MAX`.
///
/// # Examples
///
/// ```rust
/// use rheap::align_to;
///
/// assert_eq!(align_to!(13, 8), 16);
/// assert_eq!(align_to!(16, 8), 16);
/// assert_eq!(align_to!(1, 4), 4);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Returns whether `addr` is a multiple of `align` (a power of two).
pub const fn is_aligned(
  addr: usize,
  align: usize,
) -> bool {
  addr & (align - 1) == 0
}
