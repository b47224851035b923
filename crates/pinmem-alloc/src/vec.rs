//! A growable contiguous sequence over any [`ElementAlloc`].
//!
//! [`AllocVec`] behaves like `Vec<T>`: amortised growth, indexing, slicing
//! and iteration through `Deref<Target = [T]>`. The difference is that every
//! buffer transition (initial allocation, growth, final release) goes
//! through its allocator, and that those transitions are fallible and
//! return the allocator's errors instead of aborting.
//!
//! [`PinnedVec`] is the pinned-memory instantiation.
//!
//! A [`ZeroCopyView`] borrows the container, so growth while a view is
//! alive does not compile:
//!
//! ```compile_fail
//! use pinmem_alloc::{Contiguous, PinnedVec};
//!
//! let mut v = PinnedVec::<i32>::with_capacity(1).unwrap();
//! v.try_push(1).unwrap();
//! let view = v.view();
//! v.try_push(2).unwrap(); // may move the buffer under `view`
//! assert_eq!(view.len(), 1);
//! ```

#![allow(unsafe_code)]

use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::slice;

use pinmem_core::{
    AllocationError, BufferError, Contiguous, ContiguousMut, DeallocationError, ZeroCopyView,
    ZeroCopyViewMut,
};

use crate::alloc::{ElementAlloc, PinnedAlloc};
use crate::config::MIN_NON_ZERO_CAPACITY;
use crate::cuda::CudaRuntime;
use crate::raw::RawBuf;

/// A contiguous growable sequence whose storage comes from `A`.
///
/// Invariant: `len <= capacity`, and the first `len` slots of the buffer
/// are initialised.
pub struct AllocVec<T, A: ElementAlloc<T>> {
    buf: RawBuf<T, A>,
    len: usize,
}

/// A growable sequence in page-locked host memory.
///
/// `R` selects the runtime providing the memory; it is CUDA unless a test
/// runtime is plugged in.
pub type PinnedVec<T, R = CudaRuntime> = AllocVec<T, PinnedAlloc<T, R>>;

impl<T> AllocVec<T, PinnedAlloc<T, CudaRuntime>> {
    /// An empty container. Does not allocate.
    pub const fn new() -> Self {
        Self::new_in(PinnedAlloc::new())
    }

    /// An empty container with room for `capacity` elements, allocated
    /// eagerly.
    ///
    /// Pinned allocation is expensive; pre-size to avoid regrowth.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocationError> {
        Self::with_capacity_in(capacity, PinnedAlloc::new())
    }

    /// `count` clones of `value` in a buffer of exactly `count` elements.
    pub fn from_elem(count: usize, value: T) -> Result<Self, AllocationError>
    where
        T: Clone,
    {
        Self::from_elem_in(count, value, PinnedAlloc::new())
    }

    /// Clones of `items`, in order, in a buffer of exactly `items.len()`
    /// elements.
    pub fn from_slice(items: &[T]) -> Result<Self, AllocationError>
    where
        T: Clone,
    {
        Self::from_slice_in(items, PinnedAlloc::new())
    }
}

impl<T, A: ElementAlloc<T>> AllocVec<T, A> {
    /// An empty container using `alloc`. Does not allocate.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            buf: RawBuf::new_in(alloc),
            len: 0,
        }
    }

    /// An empty container with room for `capacity` elements from `alloc`.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocationError> {
        Ok(Self {
            buf: RawBuf::with_capacity_in(capacity, alloc)?,
            len: 0,
        })
    }

    /// `count` clones of `value` in a buffer of exactly `count` elements.
    pub fn from_elem_in(count: usize, value: T, alloc: A) -> Result<Self, AllocationError>
    where
        T: Clone,
    {
        let mut v = Self::with_capacity_in(count, alloc)?;
        if count > 0 {
            for _ in 1..count {
                v.write_next(value.clone());
            }
            v.write_next(value);
        }
        Ok(v)
    }

    /// Clones of `items`, in order, in a buffer of exactly `items.len()`
    /// elements.
    pub fn from_slice_in(items: &[T], alloc: A) -> Result<Self, AllocationError>
    where
        T: Clone,
    {
        let mut v = Self::with_capacity_in(items.len(), alloc)?;
        for item in items {
            v.write_next(item.clone());
        }
        Ok(v)
    }

    /// Collect `iter`, growing as needed.
    pub fn try_from_iter_in<I>(iter: I, alloc: A) -> Result<Self, BufferError>
    where
        I: IntoIterator<Item = T>,
    {
        let iter = iter.into_iter();
        let mut v = Self::with_capacity_in(iter.size_hint().0, alloc)?;
        for item in iter {
            v.try_push(item)?;
        }
        Ok(v)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no live elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the current buffer can hold.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// The allocator owning the buffer.
    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    /// Address of the buffer. Dangling (but aligned) while nothing is
    /// allocated.
    pub fn as_ptr(&self) -> *const T {
        self.buf.ptr()
    }

    /// Mutable address of the buffer.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.ptr()
    }

    /// The live elements.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialised, and the pointer is
        // non-null and aligned even when nothing is allocated.
        unsafe { slice::from_raw_parts(self.buf.ptr(), self.len) }
    }

    /// The live elements, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as `as_slice`, with unique access through `&mut self`.
        unsafe { slice::from_raw_parts_mut(self.buf.ptr(), self.len) }
    }

    /// Append `value`, growing the buffer if it is full.
    ///
    /// On growth failure the container is unchanged (for an acquisition
    /// failure) or already lives in the new buffer (for a failure to
    /// release the old one); in both cases `value` is not appended.
    pub fn try_push(&mut self, value: T) -> Result<(), BufferError> {
        if self.len == self.capacity() {
            self.reserve(1)?;
        }
        self.write_next(value);
        Ok(())
    }

    /// Append `value` if there is room, without growing.
    pub fn push_within_capacity(&mut self, value: T) -> Result<(), T> {
        if self.len == self.capacity() {
            return Err(value);
        }
        self.write_next(value);
        Ok(())
    }

    /// Ensure room for at least `additional` more elements, growing
    /// geometrically.
    pub fn reserve(&mut self, additional: usize) -> Result<(), BufferError> {
        let required = self.required(additional)?;
        if required <= self.capacity() {
            return Ok(());
        }
        let new_cap = self
            .capacity()
            .saturating_mul(2)
            .max(required)
            .max(MIN_NON_ZERO_CAPACITY);
        self.grow_to(new_cap)
    }

    /// Ensure room for exactly `additional` more elements.
    pub fn reserve_exact(&mut self, additional: usize) -> Result<(), BufferError> {
        let required = self.required(additional)?;
        if required <= self.capacity() {
            return Ok(());
        }
        self.grow_to(required)
    }

    /// Append clones of `items`.
    pub fn try_extend_from_slice(&mut self, items: &[T]) -> Result<(), BufferError>
    where
        T: Clone,
    {
        self.reserve(items.len())?;
        for item in items {
            self.write_next(item.clone());
        }
        Ok(())
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot `len` was initialised and is now outside the live
        // range, so it is read exactly once.
        Some(unsafe { ptr::read(self.buf.ptr().add(self.len)) })
    }

    /// Drop elements beyond `len`. Capacity is unchanged.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = self.len - len;
        self.len = len;
        // SAFETY: the `tail` slots after `len` are initialised and no longer
        // reachable through `self`.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.buf.ptr().add(len), tail));
        }
    }

    /// Drop all elements. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// A copy in a fresh buffer from a clone of the same allocator.
    pub fn try_clone(&self) -> Result<Self, AllocationError>
    where
        T: Clone,
    {
        Self::from_slice_in(self.as_slice(), self.allocator().clone())
    }

    /// A zero-copy view of the live elements.
    pub fn view(&self) -> ZeroCopyView<'_, T> {
        ZeroCopyView::new(self.as_slice())
    }

    /// A writable zero-copy view of the live elements.
    pub fn view_mut(&mut self) -> ZeroCopyViewMut<'_, T> {
        ZeroCopyViewMut::new(self.as_mut_slice())
    }

    /// Drop the elements and release the buffer, reporting a release
    /// failure instead of logging it as `Drop` does.
    pub fn free(self) -> Result<(), DeallocationError> {
        let mut this = ManuallyDrop::new(self);
        this.clear();
        // SAFETY: `this` is never touched again and its destructor does not
        // run, so the buffer is moved out exactly once.
        let buf = unsafe { ptr::read(&this.buf) };
        buf.release()
    }

    fn required(&self, additional: usize) -> Result<usize, AllocationError> {
        self.len
            .checked_add(additional)
            .ok_or_else(AllocationError::capacity_overflow)
    }

    fn grow_to(&mut self, new_cap: usize) -> Result<(), BufferError> {
        // SAFETY: the first `len` slots are initialised and `len < new_cap`.
        unsafe { self.buf.reallocate(self.len, new_cap) }
    }

    /// Write `value` into slot `len`. The caller ensures there is room.
    fn write_next(&mut self, value: T) {
        debug_assert!(self.len < self.capacity());
        // SAFETY: `len < capacity`, so the slot is inside the buffer and
        // uninitialised.
        unsafe { ptr::write(self.buf.ptr().add(self.len), value) };
        self.len += 1;
    }
}

impl<T, A: ElementAlloc<T>> Drop for AllocVec<T, A> {
    fn drop(&mut self) {
        // SAFETY: the live elements are dropped once; `buf` releases the
        // storage afterwards.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.buf.ptr(), self.len));
        }
    }
}

impl<T, A: ElementAlloc<T> + Default> Default for AllocVec<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, A: ElementAlloc<T>> Deref for AllocVec<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: ElementAlloc<T>> DerefMut for AllocVec<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: ElementAlloc<T>> AsRef<[T]> for AllocVec<T, A> {
    fn as_ref(&self) -> &[T] {
        self
    }
}

impl<T, A: ElementAlloc<T>> AsMut<[T]> for AllocVec<T, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T, A: ElementAlloc<T>> Contiguous<T> for AllocVec<T, A> {
    fn as_contiguous(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: ElementAlloc<T>> ContiguousMut<T> for AllocVec<T, A> {
    fn as_contiguous_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, T, A: ElementAlloc<T>> IntoIterator for &'a AllocVec<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: ElementAlloc<T>> IntoIterator for &'a mut AllocVec<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: fmt::Debug, A: ElementAlloc<T>> fmt::Debug for AllocVec<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_slice(), f)
    }
}

impl<T, U, A, B> PartialEq<AllocVec<U, B>> for AllocVec<T, A>
where
    T: PartialEq<U>,
    A: ElementAlloc<T>,
    B: ElementAlloc<U>,
{
    fn eq(&self, other: &AllocVec<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: ElementAlloc<T>> Eq for AllocVec<T, A> {}

impl<T, U, A> PartialEq<[U]> for AllocVec<T, A>
where
    T: PartialEq<U>,
    A: ElementAlloc<T>,
{
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U, A> PartialEq<&[U]> for AllocVec<T, A>
where
    T: PartialEq<U>,
    A: ElementAlloc<T>,
{
    fn eq(&self, other: &&[U]) -> bool {
        self.as_slice() == *other
    }
}

impl<T, U, A, const N: usize> PartialEq<[U; N]> for AllocVec<T, A>
where
    T: PartialEq<U>,
    A: ElementAlloc<T>,
{
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, U, A> PartialEq<Vec<U>> for AllocVec<T, A>
where
    T: PartialEq<U>,
    A: ElementAlloc<T>,
{
    fn eq(&self, other: &Vec<U>) -> bool {
        self.as_slice() == other.as_slice()
    }
}
