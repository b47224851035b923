//! The accelerator runtime boundary.
//!
//! Two capabilities are consumed from the runtime: acquire N bytes of
//! pinned host memory, and release it again. Both are synchronous and
//! authoritative on success or failure.

#![allow(unsafe_code)]

use std::fmt;
use std::ptr::NonNull;

use pinmem_core::RuntimeFault;

/// A source of page-locked host memory.
///
/// Implementations must hand out memory aligned to at least
/// [`PINNED_ALIGNMENT`](crate::config::PINNED_ALIGNMENT) bytes that stays
/// valid and resident until released.
pub trait HostRuntime: Clone + fmt::Debug {
    /// Short name used in log records.
    fn name(&self) -> &'static str;

    /// Acquire `byte_count` (> 0) bytes of pinned host memory.
    fn acquire_pinned(&self, byte_count: usize) -> Result<NonNull<u8>, RuntimeFault>;

    /// Release memory obtained from [`acquire_pinned`](Self::acquire_pinned).
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `acquire_pinned` on a runtime of the
    /// same type and must not have been released already. The memory must
    /// not be accessed afterwards.
    unsafe fn release_pinned(&self, ptr: NonNull<u8>) -> Result<(), RuntimeFault>;
}
