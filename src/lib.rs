//! # rheap - A First-Fit Heap for a Single Static Region
//!
//! This crate provides a small **first-fit free-list allocator** that runs
//! without an operating system or the standard library. The caller hands it a
//! block of memory once; from then on it serves allocations out of that block
//! and nowhere else.
//!
//! ## Overview
//!
//! Every byte of the region belongs to exactly one block, and every block
//! starts with a header. The headers form a chain in address order:
//!
//! ```text
//!   Managed Region:
//!
//!   region_start                                                region_end
//!   ▼                                                                    ▼
//!   ┌────────┬──────────┬────────┬──────┬────────┬─────────────────────────┐
//!   │ header │ payload  │ header │ pay- │ header │        payload          │
//!   │  USED  │  (user)  │  FREE  │ load │  USED  │        (user)           │
//!   └────────┴──────────┴────────┴──────┴────────┴─────────────────────────┘
//!   │ next ─────────────▶        │ next ─▶       │ next = none
//!
//!   Links are byte offsets from region_start, so the chain never holds
//!   a pointer into itself.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rheap
//!   ├── align      - Alignment helpers (align_to!, is_aligned)
//!   ├── block      - Header encoding (internal)
//!   ├── error      - AllocError and its status mapping
//!   ├── heap       - Heap, the locked public face
//!   ├── lock       - Critical-section capabilities
//!   ├── state      - Block chain, first-fit and coalescing (internal)
//!   ├── stats      - HeapStats snapshots
//!   └── status     - Packed 32-bit status words
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rheap::Heap;
//!
//! #[repr(align(8))]
//! struct Region([u8; 1024]);
//!
//! let mut region = Region([0; 1024]);
//! let heap: Heap = Heap::new();
//! heap.init(&mut region.0).unwrap();
//!
//! let ptr = heap.allocate(48).unwrap().cast::<u64>();
//! unsafe { ptr.as_ptr().write(42) };
//!
//! heap.release(ptr.as_ptr().cast()).unwrap();
//! ```
//!
//! ## How It Works
//!
//! Allocation rounds the request up to the alignment and takes the **first**
//! free block that is large enough. If the block has room for another header
//! after the request, it is split:
//!
//! ```text
//!   Before:  ┌────────┬─────────────────────────────────────┐
//!            │  FREE  │               200 bytes             │
//!            └────────┴─────────────────────────────────────┘
//!
//!   allocate(20) → rounded to 24
//!
//!   After:   ┌────────┬──────────┬────────┬─────────────────┐
//!            │  USED  │ 24 bytes │  FREE  │ 200 - 24 - hdr  │
//!            └────────┴──────────┴────────┴─────────────────┘
//!                     ▲
//!                     └── Pointer returned to user
//! ```
//!
//! Releasing marks the block free and immediately merges it with a free
//! successor, then with a free predecessor, so two free blocks are never
//! left side by side:
//!
//! ```text
//!   ┌──────┬──────┬──────┐      release(B)      ┌────────────────────┐
//!   │ A:FR │ B:US │ C:FR │   ───────────────▶   │     A:FREE         │
//!   └──────┴──────┴──────┘                      └────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **`no_std`**: needs nothing but `core`
//! - **Bounded**: never touches memory outside the region it was given
//! - **Checked**: bad, foreign and double-freed pointers are reported, not
//!   trusted
//! - **Observable**: free-byte queries, chain statistics and a full integrity
//!   audit
//! - **Pluggable locking**: any `lock_api::RawMutex` guards the heap
//!
//! ## Limitations
//!
//! - **First-fit only**: no size classes, no best-fit
//! - **No realloc and no compaction**
//! - **Fixed alignment**: requests for stricter alignment than the heap's
//!   `ALIGN` are refused by the `GlobalAlloc` adapter
//! - **Linear scans**: allocation and release walk the chain
//!
//! ## Cargo Features
//!
//! - `enabled` (default): the real allocator. Without it every operation is
//!   a stub returning [`AllocError::Disabled`], which is a supported
//!   configuration for builds that must not carry a heap.
#![cfg_attr(not(test), no_std)]

pub mod align;
mod block;
mod error;
mod heap;
pub mod lock;
#[cfg_attr(not(feature = "enabled"), allow(dead_code))]
mod state;
mod stats;
pub mod status;

#[cfg(test)]
mod test_utils;

pub use error::{AllocError, AllocResult};
pub use heap::{DEFAULT_ALIGNMENT, Heap};
pub use lock::{LocalRawMutex, SpinRawMutex};
pub use stats::HeapStats;
pub use status::Status;
