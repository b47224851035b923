//! Pageable and pinned vector classes, one pair per element type.
//!
//! Every class is frozen: Python code can read and write the elements
//! through `as_ndarray()` but can neither grow nor free the buffer, so an
//! array stays valid for as long as it keeps its vector alive.

use std::mem::size_of;

use numpy::ndarray::ArrayView1;
use numpy::{Element, PyArray1};
use pyo3::exceptions::PyIndexError;
use pyo3::prelude::*;

use pinmem_alloc::{AllocVec, HostRuntime, PinnedAlloc, PinnedVec};
use pinmem_core::{AllocationError, BufferError, Contiguous, ZeroCopyView};

use crate::error;

/// Resolve a Python index (negative counts from the end) against `len`.
fn normalize_index(index: isize, len: usize) -> Option<usize> {
    if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        let index = index.unsigned_abs();
        (index < len).then_some(index)
    }
}

/// `count` elements `fill(0), fill(1), ...` in ordinary heap memory.
fn pageable_filled<T>(count: usize, fill: fn(usize) -> T) -> Result<Vec<T>, AllocationError> {
    let mut v = Vec::new();
    v.try_reserve_exact(count).map_err(|e| {
        AllocationError::new(count.saturating_mul(size_of::<T>()), e.to_string())
    })?;
    v.extend((0..count).map(fill));
    Ok(v)
}

/// `count` elements `fill(0), fill(1), ...` from `alloc`, acquired in a
/// single allocation.
fn pinned_filled_in<T, R: HostRuntime>(
    count: usize,
    fill: fn(usize) -> T,
    alloc: PinnedAlloc<T, R>,
) -> Result<PinnedVec<T, R>, BufferError> {
    AllocVec::try_from_iter_in((0..count).map(fill), alloc)
}

/// [`pinned_filled_in`] over the CUDA runtime.
fn pinned_filled<T>(count: usize, fill: fn(usize) -> T) -> Result<PinnedVec<T>, BufferError> {
    pinned_filled_in(count, fill, PinnedAlloc::new())
}

/// Wrap `view` in a NumPy array aliasing its memory, with `owner` as base.
///
/// # Safety
///
/// `owner` must own the memory behind `view`, must never move or release
/// it while referenced, and must tolerate the array writing to it.
unsafe fn aliasing_array<'py, T: Element>(
    view: ZeroCopyView<'_, T>,
    owner: Bound<'py, PyAny>,
) -> Bound<'py, PyArray1<T>> {
    debug_assert_eq!(view.strides(), [size_of::<T>()]);
    let shaped = ArrayView1::from(view.as_slice());
    // SAFETY: the array holds a reference to `owner`, which keeps the memory
    // alive and in place per this function's contract.
    unsafe { PyArray1::borrow_from_array(&shaped, owner) }
}

macro_rules! build_storage {
    (pageable, $py:ident, $count:ident, $t:ty) => {
        $py.detach(|| pageable_filled($count, |i| i as $t))
            .map_err(error::allocation_error)
    };
    (pinned, $py:ident, $count:ident, $t:ty) => {{
        let inner = $py
            .detach(|| pinned_filled($count, |i| i as $t))
            .map_err(error::buffer_error)?;
        tracing::debug!(
            count = $count,
            bytes = $count * size_of::<$t>(),
            "pinned vector constructed"
        );
        Ok::<_, PyErr>(inner)
    }};
}

macro_rules! vector_class {
    ($class:ident, $doc:tt, $t:ty, $storage:ty, $kind:ident, $pinned:tt) => {
        #[doc = $doc]
        #[pyclass(frozen, module = "pinmem")]
        pub(crate) struct $class {
            inner: $storage,
        }

        #[pymethods]
        impl $class {
            /// Create a vector of `count` elements holding `0, 1, ..., count - 1`
            /// converted to the element type (values wrap when they do not fit).
            #[new]
            fn new(py: Python<'_>, count: usize) -> PyResult<Self> {
                let inner: $storage = build_storage!($kind, py, count, $t)?;
                Ok(Self { inner })
            }

            /// A NumPy array over this vector's buffer, without copying.
            /// Writes through it change the vector. The array keeps this
            /// vector alive.
            fn as_ndarray<'py>(slf: &Bound<'py, Self>) -> Bound<'py, PyArray1<$t>> {
                let view = slf.get().inner.view();
                // SAFETY: the class is frozen and exposes no growth, so the
                // buffer stays put until the vector is collected. Element
                // reads from Rust happen under the GIL, never overlapping a
                // NumPy write.
                unsafe { aliasing_array(view, slf.clone().into_any()) }
            }

            /// Number of elements that fit without reallocating.
            #[getter]
            fn capacity(&self) -> usize {
                self.inner.capacity()
            }

            /// Whether the buffer is page-locked.
            #[getter]
            fn is_pinned(&self) -> bool {
                $pinned
            }

            fn __len__(&self) -> usize {
                self.inner.len()
            }

            fn __getitem__(&self, index: isize) -> PyResult<$t> {
                normalize_index(index, self.inner.len())
                    .map(|i| self.inner[i])
                    .ok_or_else(|| PyIndexError::new_err(concat!(stringify!($class), " index out of range")))
            }

            fn __repr__(&self) -> String {
                format!(
                    concat!(stringify!($class), "(len={}, capacity={})"),
                    self.inner.len(),
                    self.inner.capacity()
                )
            }
        }
    };
}

macro_rules! vector_classes {
    ($($t:ty => $pageable:ident, $pinned:ident;)+) => {
        $(
            vector_class!(
                $pageable,
                "A vector in ordinary (pageable) host memory.",
                $t,
                Vec<$t>,
                pageable,
                false
            );
            vector_class!(
                $pinned,
                "A vector in page-locked (pinned) host memory from the CUDA runtime.",
                $t,
                PinnedVec<$t>,
                pinned,
                true
            );
        )+

        /// Add every vector class to `m`.
        pub(crate) fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
            $(
                m.add_class::<$pageable>()?;
                m.add_class::<$pinned>()?;
            )+
            Ok(())
        }
    };
}

vector_classes! {
    i8 => PageableI8Vector, PinnedI8Vector;
    u8 => PageableU8Vector, PinnedU8Vector;
    i16 => PageableI16Vector, PinnedI16Vector;
    u16 => PageableU16Vector, PinnedU16Vector;
    i32 => PageableI32Vector, PinnedI32Vector;
    u32 => PageableU32Vector, PinnedU32Vector;
    i64 => PageableI64Vector, PinnedI64Vector;
    u64 => PageableU64Vector, PinnedU64Vector;
    f32 => PageableF32Vector, PinnedF32Vector;
    f64 => PageableF64Vector, PinnedF64Vector;
}
