//! The element allocator seam and the pinned allocator.
//!
//! [`ElementAlloc`] is what [`AllocVec`](crate::AllocVec) is generic over:
//! "give me room for n elements" and "take back these n elements".
//! [`PinnedAlloc`] implements it on top of a [`HostRuntime`].

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

use pinmem_core::{AllocationError, DeallocationError};

use crate::config::PINNED_ALIGNMENT;
use crate::cuda::CudaRuntime;
use crate::runtime::HostRuntime;

/// An allocator handing out uninitialised storage for `T` elements.
pub trait ElementAlloc<T>: Clone {
    /// Allocate storage for `count` elements.
    ///
    /// A zero-byte request returns a dangling, well-aligned pointer without
    /// touching the underlying memory source.
    fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocationError>;

    /// Release storage for `count` elements.
    ///
    /// A null `ptr` is a no-op.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from [`allocate`](Self::allocate) on an
    /// allocator equal to this one, with the same `count`, and must not
    /// have been released already.
    unsafe fn deallocate(&self, ptr: *mut T, count: usize) -> Result<(), DeallocationError>;
}

/// Allocates `T` elements in page-locked host memory.
///
/// Carries no state besides the runtime handle (zero-sized apart from the
/// allocation flags for [`CudaRuntime`]). Any two pinned allocators over the
/// same runtime type compare equal, whatever their element types: they all
/// draw from the same process-wide pinned pool.
pub struct PinnedAlloc<T, R = CudaRuntime> {
    runtime: R,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PinnedAlloc<T, CudaRuntime> {
    /// A pinned allocator over the CUDA runtime with default flags.
    pub const fn new() -> Self {
        Self::with_runtime(CudaRuntime::new())
    }
}

impl<T, R> PinnedAlloc<T, R> {
    /// A pinned allocator drawing from `runtime`.
    pub const fn with_runtime(runtime: R) -> Self {
        Self {
            runtime,
            _marker: PhantomData,
        }
    }

    /// The runtime this allocator draws from.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

impl<T, R: Clone> PinnedAlloc<T, R> {
    /// The same allocator for another element type.
    pub fn rebind<U>(&self) -> PinnedAlloc<U, R> {
        PinnedAlloc::with_runtime(self.runtime.clone())
    }
}

fn byte_count<T>(count: usize) -> Result<usize, AllocationError> {
    size_of::<T>()
        .checked_mul(count)
        .ok_or_else(AllocationError::capacity_overflow)
}

impl<T, R: HostRuntime> ElementAlloc<T> for PinnedAlloc<T, R> {
    fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocationError> {
        let bytes = byte_count::<T>(count)?;
        if bytes == 0 {
            return Ok(NonNull::dangling());
        }
        if align_of::<T>() > PINNED_ALIGNMENT {
            return Err(AllocationError::new(
                bytes,
                format!(
                    "element alignment of {} bytes exceeds the pinned alignment of {PINNED_ALIGNMENT} bytes",
                    align_of::<T>()
                ),
            ));
        }
        match self.runtime.acquire_pinned(bytes) {
            Ok(ptr) => {
                tracing::trace!(runtime = self.runtime.name(), bytes, ?ptr, "acquired pinned buffer");
                debug_assert_eq!(ptr.as_ptr() as usize % align_of::<T>(), 0);
                Ok(ptr.cast())
            }
            Err(fault) => {
                tracing::warn!(
                    runtime = self.runtime.name(),
                    bytes,
                    code = fault.code,
                    message = %fault.message,
                    "pinned allocation failed"
                );
                Err(AllocationError::from((bytes, fault)))
            }
        }
    }

    unsafe fn deallocate(&self, ptr: *mut T, count: usize) -> Result<(), DeallocationError> {
        let Some(ptr) = NonNull::new(ptr) else {
            return Ok(());
        };
        if size_of::<T>().saturating_mul(count) == 0 {
            return Ok(());
        }
        // SAFETY: the caller guarantees `ptr` came from `allocate` with the
        // same `count`, so it is a live runtime allocation released once.
        match unsafe { self.runtime.release_pinned(ptr.cast()) } {
            Ok(()) => {
                tracing::trace!(runtime = self.runtime.name(), ?ptr, "released pinned buffer");
                Ok(())
            }
            Err(fault) => {
                tracing::warn!(
                    runtime = self.runtime.name(),
                    ?ptr,
                    code = fault.code,
                    message = %fault.message,
                    "pinned release failed"
                );
                Err(DeallocationError::from(fault))
            }
        }
    }
}

impl<T, R: Clone> Clone for PinnedAlloc<T, R> {
    fn clone(&self) -> Self {
        Self::with_runtime(self.runtime.clone())
    }
}

impl<T, R: Copy> Copy for PinnedAlloc<T, R> {}

impl<T, R: Default> Default for PinnedAlloc<T, R> {
    fn default() -> Self {
        Self::with_runtime(R::default())
    }
}

impl<T, R: fmt::Debug> fmt::Debug for PinnedAlloc<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedAlloc")
            .field("element", &std::any::type_name::<T>())
            .field("runtime", &self.runtime)
            .finish()
    }
}

impl<T, U, R> PartialEq<PinnedAlloc<U, R>> for PinnedAlloc<T, R> {
    fn eq(&self, _other: &PinnedAlloc<U, R>) -> bool {
        true
    }
}

impl<T, R> Eq for PinnedAlloc<T, R> {}

impl<T, U, R: Clone> From<&PinnedAlloc<U, R>> for PinnedAlloc<T, R> {
    fn from(other: &PinnedAlloc<U, R>) -> Self {
        other.rebind()
    }
}
