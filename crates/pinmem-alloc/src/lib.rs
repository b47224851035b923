//! Pinned host memory allocation for accelerator transfers.
//!
//! Page-locked ("pinned") host memory can be transferred to and from a CUDA
//! device at full bus bandwidth, without the driver staging it through its
//! own pinned bounce buffer first. This crate turns the runtime's pinned
//! allocation primitives into an allocator and a growable container. This
//! crate is the only one in the workspace that may contain `unsafe` code.
//!
//! # Architecture
//!
//! ```text
//! PinnedVec<T>  = AllocVec<T, PinnedAlloc<T>>
//! ├── RawBuf<T, A>          (pointer + capacity, grow / release)
//! │   └── ElementAlloc<T>   (allocate n elements / deallocate p, n)
//! │       └── PinnedAlloc<T, R: HostRuntime>
//! │           └── CudaRuntime  (cudaHostAlloc / cudaFreeHost, loaded at runtime)
//! └── len
//! ```
//!
//! The container knows nothing about accelerators: it is generic over
//! [`ElementAlloc`], and every buffer it ever owns comes from, and goes back
//! to, its allocator.
//!
//! # Example
//!
//! ```no_run
//! use pinmem_alloc::{pinned_vec, PinnedVec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut staging = PinnedVec::<f32>::with_capacity(1 << 20)?;
//! staging.try_push(1.5)?;
//!
//! let lut = pinned_vec![1u8, 2, 3]?;
//! assert_eq!(lut, [1, 2, 3]);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod alloc;
pub mod config;
pub mod cuda;
mod raw;
pub mod runtime;
pub mod vec;

// Public re-exports for the primary API surface.
pub use alloc::{ElementAlloc, PinnedAlloc};
pub use config::{HostAllocFlags, RuntimeConfig};
pub use cuda::CudaRuntime;
pub use pinmem_core::{
    AllocationError, BufferError, Contiguous, ContiguousMut, DeallocationError, RuntimeFault,
    ZeroCopyView, ZeroCopyViewMut,
};
pub use runtime::HostRuntime;
pub use vec::{AllocVec, PinnedVec};

/// Build a [`PinnedVec`] from a literal list of elements or a repeated
/// element.
///
/// Evaluates to `Result<PinnedVec<T>, AllocationError>`. The `in alloc;`
/// form builds the container with an explicit allocator instead of the
/// default CUDA one.
///
/// ```no_run
/// use pinmem_alloc::pinned_vec;
///
/// # fn main() -> Result<(), pinmem_alloc::AllocationError> {
/// let ones = pinned_vec![1.0f64; 16]?;
/// let small = pinned_vec![1i16, 2, 3]?;
/// assert_eq!(ones.len(), 16);
/// assert_eq!(small, [1, 2, 3]);
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! pinned_vec {
    (in $alloc:expr;) => {
        ::core::result::Result::<_, $crate::AllocationError>::Ok($crate::AllocVec::new_in($alloc))
    };
    (in $alloc:expr; $elem:expr; $n:expr) => {
        $crate::AllocVec::from_elem_in($n, $elem, $alloc)
    };
    (in $alloc:expr; $($x:expr),+ $(,)?) => {
        $crate::AllocVec::from_slice_in(&[$($x),+], $alloc)
    };
    () => {
        ::core::result::Result::<_, $crate::AllocationError>::Ok($crate::PinnedVec::new())
    };
    ($elem:expr; $n:expr) => {
        $crate::PinnedVec::from_elem($n, $elem)
    };
    ($($x:expr),+ $(,)?) => {
        $crate::PinnedVec::from_slice(&[$($x),+])
    };
}
