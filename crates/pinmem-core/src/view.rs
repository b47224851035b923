//! Zero-copy views over contiguous buffers.
//!
//! A [`ZeroCopyView`] is the descriptor a foreign numeric-array consumer
//! needs to alias a buffer in place: data pointer, element count and
//! element stride. It never owns the buffer and never releases it.
//!
//! The view borrows the container it was taken from, so anything that could
//! move or release the buffer while the view is alive is rejected at compile
//! time:
//!
//! ```compile_fail
//! use pinmem_core::ZeroCopyView;
//!
//! let mut data = vec![1u8, 2, 3];
//! let view = ZeroCopyView::of(&data);
//! data.push(4); // may reallocate: the view would dangle
//! assert_eq!(view.len(), 3);
//! ```

use std::fmt;
use std::mem::size_of;

/// A sequence whose elements live in one dense, contiguous buffer.
pub trait Contiguous<T> {
    /// The live elements, in order.
    fn as_contiguous(&self) -> &[T];

    /// A zero-copy view of the current buffer.
    fn view(&self) -> ZeroCopyView<'_, T> {
        ZeroCopyView::new(self.as_contiguous())
    }
}

impl<T> Contiguous<T> for [T] {
    fn as_contiguous(&self) -> &[T] {
        self
    }
}

impl<T, const N: usize> Contiguous<T> for [T; N] {
    fn as_contiguous(&self) -> &[T] {
        self
    }
}

impl<T> Contiguous<T> for Vec<T> {
    fn as_contiguous(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> Contiguous<T> for Box<[T]> {
    fn as_contiguous(&self) -> &[T] {
        self
    }
}

/// A [`Contiguous`] sequence whose elements can be written in place.
pub trait ContiguousMut<T>: Contiguous<T> {
    /// The live elements, in order, writable.
    fn as_contiguous_mut(&mut self) -> &mut [T];

    /// A writable zero-copy view of the current buffer.
    fn view_mut(&mut self) -> ZeroCopyViewMut<'_, T> {
        ZeroCopyViewMut::new(self.as_contiguous_mut())
    }
}

impl<T> ContiguousMut<T> for [T] {
    fn as_contiguous_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T, const N: usize> ContiguousMut<T> for [T; N] {
    fn as_contiguous_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T> ContiguousMut<T> for Vec<T> {
    fn as_contiguous_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> ContiguousMut<T> for Box<[T]> {
    fn as_contiguous_mut(&mut self) -> &mut [T] {
        self
    }
}

/// Non-owning, one-dimensional view of a dense buffer of `T`.
///
/// The data pointer is the originating container's buffer address at the
/// time the view was taken. Shape is `[len]`, stride is `[size_of::<T>()]`
/// bytes.
pub struct ZeroCopyView<'a, T> {
    data: &'a [T],
}

impl<T> Clone for ZeroCopyView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ZeroCopyView<'_, T> {}

impl<'a, T> ZeroCopyView<'a, T> {
    /// View an existing slice.
    pub fn new(data: &'a [T]) -> Self {
        Self { data }
    }

    /// View any contiguous container.
    pub fn of<C>(container: &'a C) -> Self
    where
        C: Contiguous<T> + ?Sized,
    {
        Self::new(container.as_contiguous())
    }

    /// Address of the first element.
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// One-dimensional shape, `[len]`.
    pub fn shape(&self) -> [usize; 1] {
        [self.data.len()]
    }

    /// Byte strides per dimension, `[size_of::<T>()]` for a dense layout.
    pub fn strides(&self) -> [usize; 1] {
        [size_of::<T>()]
    }

    /// Total size of the viewed region in bytes.
    pub fn nbytes(&self) -> usize {
        size_of::<T>() * self.data.len()
    }

    /// The viewed elements, with the lifetime of the originating container.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }
}

impl<T> fmt::Debug for ZeroCopyView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZeroCopyView")
            .field("ptr", &self.as_ptr())
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .finish()
    }
}

/// Writable counterpart of [`ZeroCopyView`].
///
/// Holds the container's buffer exclusively for its lifetime; writes land
/// in the buffer in place and are seen by the container once the view is
/// dropped.
pub struct ZeroCopyViewMut<'a, T> {
    data: &'a mut [T],
}

impl<'a, T> ZeroCopyViewMut<'a, T> {
    /// View an existing slice.
    pub fn new(data: &'a mut [T]) -> Self {
        Self { data }
    }

    /// View any contiguous container.
    pub fn of<C>(container: &'a mut C) -> Self
    where
        C: ContiguousMut<T> + ?Sized,
    {
        Self::new(container.as_contiguous_mut())
    }

    /// Address of the first element.
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    /// Writable address of the first element.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the view has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// One-dimensional shape, `[len]`.
    pub fn shape(&self) -> [usize; 1] {
        [self.data.len()]
    }

    /// Byte strides per dimension.
    pub fn strides(&self) -> [usize; 1] {
        [size_of::<T>()]
    }

    /// Total size of the viewed region in bytes.
    pub fn nbytes(&self) -> usize {
        size_of::<T>() * self.data.len()
    }

    /// The viewed elements.
    pub fn as_slice(&self) -> &[T] {
        self.data
    }

    /// The viewed elements, writable.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }

    /// Give up the view descriptor and keep the borrow of the elements.
    pub fn into_mut_slice(self) -> &'a mut [T] {
        self.data
    }
}

impl<T> fmt::Debug for ZeroCopyViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZeroCopyViewMut")
            .field("ptr", &self.as_ptr())
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .finish()
    }
}
