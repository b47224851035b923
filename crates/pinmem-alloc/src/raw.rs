//! Low-level buffer ownership for [`AllocVec`](crate::AllocVec).
//!
//! [`RawBuf`] owns a pointer and a capacity obtained from an
//! [`ElementAlloc`], and is the only place that acquires, moves between and
//! releases buffers. It knows nothing about which slots are initialised;
//! the caller passes the live length where it matters.

#![allow(unsafe_code)]

use std::mem::{self, size_of, ManuallyDrop};
use std::ptr::{self, NonNull};

use pinmem_core::{AllocationError, BufferError, DeallocationError};

use crate::alloc::ElementAlloc;

pub(crate) struct RawBuf<T, A: ElementAlloc<T>> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
}

// SAFETY: `RawBuf` uniquely owns its buffer, like `Box<[T]>`.
unsafe impl<T: Send, A: ElementAlloc<T> + Send> Send for RawBuf<T, A> {}
// SAFETY: shared access only hands out shared access to the elements.
unsafe impl<T: Sync, A: ElementAlloc<T> + Sync> Sync for RawBuf<T, A> {}

impl<T, A: ElementAlloc<T>> RawBuf<T, A> {
    const IS_ZST: bool = size_of::<T>() == 0;

    pub(crate) const fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: 0,
            alloc,
        }
    }

    pub(crate) fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocationError> {
        if Self::IS_ZST || capacity == 0 {
            return Ok(Self::new_in(alloc));
        }
        let ptr = alloc.allocate(capacity)?;
        Ok(Self {
            ptr,
            cap: capacity,
            alloc,
        })
    }

    pub(crate) fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub(crate) fn capacity(&self) -> usize {
        if Self::IS_ZST {
            usize::MAX
        } else {
            self.cap
        }
    }

    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Move the first `len` elements into a fresh buffer of `new_cap`
    /// elements and release the old buffer.
    ///
    /// If acquiring the new buffer fails, nothing changes. If releasing the
    /// old buffer fails, the elements already live in the new buffer.
    ///
    /// # Safety
    ///
    /// The first `len` slots must be initialised and `len <= new_cap`.
    pub(crate) unsafe fn reallocate(&mut self, len: usize, new_cap: usize) -> Result<(), BufferError> {
        debug_assert!(len <= new_cap);
        if Self::IS_ZST {
            return Ok(());
        }
        let new_ptr = self.alloc.allocate(new_cap)?;
        // SAFETY: the old buffer holds `len` initialised elements, the new one
        // has room for `new_cap >= len`, and they are distinct allocations.
        unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), len) };
        let old_ptr = mem::replace(&mut self.ptr, new_ptr);
        let old_cap = mem::replace(&mut self.cap, new_cap);
        if old_cap > 0 {
            // SAFETY: `old_ptr` came from this allocator with `old_cap` and is
            // no longer referenced.
            unsafe { self.alloc.deallocate(old_ptr.as_ptr(), old_cap) }?;
        }
        Ok(())
    }

    /// Release the buffer, reporting a release failure to the caller.
    ///
    /// Elements are not dropped; the caller must have dropped them.
    pub(crate) fn release(self) -> Result<(), DeallocationError> {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never touched again and its destructor does not
        // run, so the allocator is moved out exactly once.
        let alloc = unsafe { ptr::read(&this.alloc) };
        if this.cap == 0 {
            return Ok(());
        }
        // SAFETY: the buffer came from `alloc` with `cap` and is released once.
        unsafe { alloc.deallocate(this.ptr.as_ptr(), this.cap) }
    }
}

impl<T, A: ElementAlloc<T>> Drop for RawBuf<T, A> {
    fn drop(&mut self) {
        if self.cap == 0 {
            return;
        }
        // SAFETY: the buffer came from `alloc` with `cap` and this is the last
        // use of it.
        if let Err(e) = unsafe { self.alloc.deallocate(self.ptr.as_ptr(), self.cap) } {
            tracing::error!(error = %e, capacity = self.cap, "leaking buffer: release failed during drop");
        }
    }
}
