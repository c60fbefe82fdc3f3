//! Packed 32-bit status words.
//!
//! ```text
//!   31        24 23        16 15         8 7          0
//!   ┌───────────┬────────────┬────────────┬────────────┐
//!   │ severity  │   module   │   class    │    code    │
//!   └───────────┴────────────┴────────────┴────────────┘
//! ```
//!
//! A status of `0` means success. Every [`AllocError`](crate::AllocError)
//! converts into one of these, so hosts that only speak integers can still
//! get a precise answer out of the allocator.

use core::fmt;

/// Impact of a status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
  Ok = 0x00,
  Info = 0x01,
  Warning = 0x02,
  Error = 0x03,
  Fatal = 0x04,
}

/// Library module a status originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Module {
  None = 0x00,
  Core = 0x01,
  Types = 0x02,
  Memory = 0x03,
  String = 0x04,
  Alloc = 0x05,
  Math = 0x06,
  Stdlib = 0x07,
  Platform = 0x08,
}

/// Category of a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorClass {
  None = 0x00,
  NullPointer = 0x01,
  OutOfRange = 0x02,
  Overflow = 0x03,
  InvalidParameter = 0x04,
  NotSupported = 0x05,
  Internal = 0x06,
  Memory = 0x07,
}

/// Codes of the [`Module::Alloc`] module.
pub mod code {
  pub const OK: u8 = 0x00;
  pub const INVALID_SIZE: u8 = 0x01;
  pub const NO_MEMORY: u8 = 0x02;
  pub const INVALID_POINTER: u8 = 0x03;
  pub const ALREADY_INITIALIZED: u8 = 0x04;
  pub const NOT_INITIALIZED: u8 = 0x05;
  pub const ALIGNMENT: u8 = 0x06;
  pub const DOUBLE_FREE: u8 = 0x07;
  pub const CORRUPTED: u8 = 0x08;
  pub const DISABLED: u8 = 0xFE;
  pub const UNKNOWN: u8 = 0xFF;
}

impl Severity {
  pub const fn from_bits(bits: u8) -> Option<Self> {
    Some(match bits {
      0x00 => Self::Ok,
      0x01 => Self::Info,
      0x02 => Self::Warning,
      0x03 => Self::Error,
      0x04 => Self::Fatal,
      _ => return None,
    })
  }
}

impl Module {
  pub const fn from_bits(bits: u8) -> Option<Self> {
    Some(match bits {
      0x00 => Self::None,
      0x01 => Self::Core,
      0x02 => Self::Types,
      0x03 => Self::Memory,
      0x04 => Self::String,
      0x05 => Self::Alloc,
      0x06 => Self::Math,
      0x07 => Self::Stdlib,
      0x08 => Self::Platform,
      _ => return None,
    })
  }
}

impl ErrorClass {
  pub const fn from_bits(bits: u8) -> Option<Self> {
    Some(match bits {
      0x00 => Self::None,
      0x01 => Self::NullPointer,
      0x02 => Self::OutOfRange,
      0x03 => Self::Overflow,
      0x04 => Self::InvalidParameter,
      0x05 => Self::NotSupported,
      0x06 => Self::Internal,
      0x07 => Self::Memory,
      _ => return None,
    })
  }
}

/// A packed status word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Status(u32);

impl Status {
  pub const OK: Self = Self(0);

  pub const fn new(
    severity: Severity,
    module: Module,
    class: ErrorClass,
    code: u8,
  ) -> Self {
    Self(
      (severity as u32) << 24 | (module as u32) << 16 | (class as u32) << 8 | code as u32,
    )
  }

  pub const fn from_bits(bits: u32) -> Self {
    Self(bits)
  }

  pub const fn bits(self) -> u32 {
    self.0
  }

  pub const fn is_ok(self) -> bool {
    self.0 == Self::OK.0
  }

  /// Decoded severity, `None` if the byte holds no known severity.
  pub const fn severity(self) -> Option<Severity> {
    Severity::from_bits((self.0 >> 24) as u8)
  }

  pub const fn module(self) -> Option<Module> {
    Module::from_bits((self.0 >> 16) as u8)
  }

  pub const fn class(self) -> Option<ErrorClass> {
    ErrorClass::from_bits((self.0 >> 8) as u8)
  }

  pub const fn code(self) -> u8 {
    self.0 as u8
  }
}

impl fmt::Debug for Status {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Status")
      .field("severity", &self.severity())
      .field("module", &self.module())
      .field("class", &self.class())
      .field("code", &format_args!("{:#04x}", self.code()))
      .finish()
  }
}

impl fmt::Display for Status {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:#010x}", self.0)
  }
}

impl From<Status> for u32 {
  fn from(status: Status) -> Self {
    status.0
  }
}
