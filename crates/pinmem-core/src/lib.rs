//! Core types for the pinmem workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! error taxonomy shared by the allocator and container crates, and the
//! zero-copy view that exposes a contiguous buffer to foreign consumers
//! without copying or transferring ownership.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod view;

pub use error::{AllocationError, BufferError, DeallocationError, RuntimeFault};
pub use view::{Contiguous, ContiguousMut, ZeroCopyView, ZeroCopyViewMut};
