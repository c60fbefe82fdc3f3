//! Errors for the `rheap` crate.

use crate::status::{ErrorClass, Module, Severity, Status, code};

/// Everything that can go wrong while talking to a [`Heap`](crate::Heap).
///
/// No variant is ever returned after the heap has been partially mutated:
/// every check runs before the first header is written.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  #[error("null pointer")]
  NullPointer,
  #[error("region of {size} bytes is too small, need at least {min}")]
  RegionTooSmall { size: usize, min: usize },
  #[error("region start {addr:#x} is not aligned to {align}")]
  Misaligned { addr: usize, align: usize },
  #[error("region of {size} bytes at {addr:#x} wraps the address space")]
  RegionOverflow { addr: usize, size: usize },
  #[error("heap already initialized")]
  AlreadyInitialized,
  #[error("heap not initialized")]
  NotInitialized,
  #[error("zero-sized allocation")]
  ZeroSize,
  #[error("request of {requested} bytes exceeds heap capacity of {capacity}")]
  TooLarge { requested: usize, capacity: usize },
  #[error("out of memory for a request of {requested} bytes")]
  OutOfMemory { requested: usize },
  #[error("pointer {addr:#x} lies outside the heap region")]
  OutOfRegion { addr: usize },
  #[error("pointer {addr:#x} is not the start of any block payload")]
  UnknownPointer { addr: usize },
  #[error("double free of {addr:#x}")]
  DoubleFree { addr: usize },
  #[error("corrupted block header at offset {offset}")]
  Corrupted { offset: usize },
  #[error("allocator disabled at build time")]
  Disabled,
}

impl AllocError {
  /// Packs this error into the 32-bit status encoding.
  pub const fn status(self) -> Status {
    use ErrorClass as C;
    use Severity as S;

    let (severity, class, code) = match self {
      Self::NullPointer => (S::Error, C::NullPointer, code::OK),
      Self::RegionTooSmall { .. } => (S::Error, C::InvalidParameter, code::INVALID_SIZE),
      Self::Misaligned { .. } => (S::Error, C::InvalidParameter, code::ALIGNMENT),
      Self::RegionOverflow { .. } => (S::Error, C::Overflow, code::INVALID_SIZE),
      Self::AlreadyInitialized => (S::Warning, C::Internal, code::ALREADY_INITIALIZED),
      Self::NotInitialized => (S::Error, C::InvalidParameter, code::NOT_INITIALIZED),
      Self::ZeroSize => (S::Error, C::InvalidParameter, code::INVALID_SIZE),
      Self::TooLarge { .. } => (S::Error, C::InvalidParameter, code::NO_MEMORY),
      Self::OutOfMemory { .. } => (S::Error, C::Memory, code::NO_MEMORY),
      Self::OutOfRegion { .. } => (S::Error, C::OutOfRange, code::INVALID_POINTER),
      Self::UnknownPointer { .. } => (S::Error, C::InvalidParameter, code::INVALID_POINTER),
      Self::DoubleFree { .. } => (S::Error, C::Memory, code::DOUBLE_FREE),
      Self::Corrupted { .. } => (S::Fatal, C::Internal, code::CORRUPTED),
      Self::Disabled => (S::Fatal, C::NotSupported, code::DISABLED),
    };

    Status::new(severity, Module::Alloc, class, code)
  }
}

impl From<AllocError> for Status {
  fn from(err: AllocError) -> Self {
    err.status()
  }
}

impl<T> From<Result<T, AllocError>> for Status {
  fn from(result: Result<T, AllocError>) -> Self {
    match result {
      Ok(_) => Self::OK,
      Err(err) => err.status(),
    }
  }
}

/// A [Result] type for heap operations.
pub type AllocResult<T> = Result<T, AllocError>;
