//! Pinmem: page-locked host memory for fast accelerator transfers.
//!
//! This is the top-level facade crate that re-exports the public API from the
//! pinmem sub-crates. For most users, adding `pinmem` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```no_run
//! use pinmem::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Fails with `AllocationError` if the CUDA runtime is missing or the
//! // pinned pool is exhausted.
//! let mut batch = PinnedVec::<f32>::with_capacity(4096)?;
//! for i in 0..4096 {
//!     batch.try_push(i as f32)?;
//! }
//!
//! // Hand the buffer to a transfer without copying.
//! let view = batch.view();
//! assert_eq!(view.shape(), [4096]);
//! assert_eq!(view.strides(), [4]);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `pinmem-core` | Error taxonomy, `Contiguous`, `ZeroCopyView` |
//! | [`alloc`] | `pinmem-alloc` | Runtime binding, `PinnedAlloc`, `AllocVec` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Error types and zero-copy views (`pinmem-core`).
pub use pinmem_core as types;

/// Runtime binding, allocator and container (`pinmem-alloc`).
///
/// [`alloc::HostRuntime`] is the seam for alternative pinned-memory
/// providers; [`alloc::CudaRuntime`] is the default.
pub use pinmem_alloc as alloc;

pub use pinmem_alloc::pinned_vec;

/// Common imports for typical pinmem usage.
///
/// ```rust
/// use pinmem::prelude::*;
/// ```
pub mod prelude {
    // Containers and allocators
    pub use pinmem_alloc::{AllocVec, ElementAlloc, PinnedAlloc, PinnedVec};

    // Runtime
    pub use pinmem_alloc::{CudaRuntime, HostAllocFlags, HostRuntime, RuntimeConfig};

    // Views
    pub use pinmem_core::{Contiguous, ContiguousMut, ZeroCopyView, ZeroCopyViewMut};

    // Errors
    pub use pinmem_core::{AllocationError, BufferError, DeallocationError};
}
