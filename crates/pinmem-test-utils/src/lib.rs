//! Test utilities and mock types for pinmem development.
//!
//! Provides [`MockRuntime`], a heap-backed stand-in for the CUDA runtime
//! that records every acquisition and release and can be told to fail.
//! It lets the allocator and container be tested on machines without an
//! accelerator.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard};

use pinmem_alloc::config::PINNED_ALIGNMENT;
use pinmem_alloc::{HostRuntime, PinnedAlloc, PinnedVec};
use pinmem_core::RuntimeFault;

/// `cudaErrorInvalidValue`.
pub const MOCK_INVALID_VALUE: i32 = 1;
/// `cudaErrorMemoryAllocation`.
pub const MOCK_OUT_OF_MEMORY: i32 = 2;

/// A [`PinnedVec`] drawing from a [`MockRuntime`].
pub type MockVec<T> = PinnedVec<T, MockRuntime>;

#[derive(Debug, Default)]
struct MockState {
    /// Live allocations by address.
    live: HashMap<usize, Layout>,
    acquired: usize,
    released: usize,
    /// Remaining successful acquisitions; `None` is unlimited.
    acquire_budget: Option<usize>,
    fail_releases: bool,
}

/// Heap-backed [`HostRuntime`] with bookkeeping and failure injection.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the allocator under test owns another.
///
/// Allocators over any two mocks compare equal, as all `PinnedAlloc`s of
/// one runtime type do, but each mock has its own live set: memory can only
/// be released through a clone of the mock that acquired it. Releasing it
/// through an unrelated mock fails with "invalid argument".
#[derive(Clone, Debug, Default)]
pub struct MockRuntime {
    state: Arc<Mutex<MockState>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runtime whose every acquisition fails with "out of memory".
    pub fn exhausted() -> Self {
        let rt = Self::new();
        rt.fail_acquire_after(0);
        rt
    }

    /// Allow `n` more successful acquisitions, then fail.
    pub fn fail_acquire_after(&self, n: usize) {
        self.state().acquire_budget = Some(n);
    }

    /// Remove any acquisition limit.
    pub fn allow_acquire(&self) {
        self.state().acquire_budget = None;
    }

    /// Make every release fail with "invalid argument" (the memory stays
    /// live).
    pub fn fail_releases(&self, fail: bool) {
        self.state().fail_releases = fail;
    }

    /// A pinned allocator for `T` drawing from this runtime.
    pub fn alloc<T>(&self) -> PinnedAlloc<T, MockRuntime> {
        PinnedAlloc::with_runtime(self.clone())
    }

    pub fn acquire_count(&self) -> usize {
        self.state().acquired
    }

    pub fn release_count(&self) -> usize {
        self.state().released
    }

    pub fn live_allocations(&self) -> usize {
        self.state().live.len()
    }

    pub fn live_bytes(&self) -> usize {
        self.state().live.values().map(Layout::size).sum()
    }

    /// Returns `true` if `ptr` is the start of a live allocation.
    pub fn is_live<T>(&self, ptr: *const T) -> bool {
        self.state().live.contains_key(&(ptr as usize))
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl HostRuntime for MockRuntime {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn acquire_pinned(&self, byte_count: usize) -> Result<NonNull<u8>, RuntimeFault> {
        let mut state = self.state();
        if let Some(budget) = state.acquire_budget.as_mut() {
            if *budget == 0 {
                return Err(RuntimeFault::new(MOCK_OUT_OF_MEMORY, "out of memory"));
            }
            *budget -= 1;
        }
        let layout = Layout::from_size_align(byte_count, PINNED_ALIGNMENT)
            .map_err(|e| RuntimeFault::new(MOCK_INVALID_VALUE, e.to_string()))?;
        // SAFETY: the allocator never asks for zero bytes.
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) })
            .ok_or_else(|| RuntimeFault::new(MOCK_OUT_OF_MEMORY, "out of memory"))?;
        state.live.insert(ptr.as_ptr() as usize, layout);
        state.acquired += 1;
        Ok(ptr)
    }

    unsafe fn release_pinned(&self, ptr: NonNull<u8>) -> Result<(), RuntimeFault> {
        let mut state = self.state();
        if state.fail_releases {
            return Err(RuntimeFault::new(MOCK_INVALID_VALUE, "invalid argument"));
        }
        let layout = state
            .live
            .remove(&(ptr.as_ptr() as usize))
            .ok_or_else(|| RuntimeFault::new(MOCK_INVALID_VALUE, "invalid argument"))?;
        // SAFETY: `ptr` was allocated above with `layout` and was still live.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        state.released += 1;
        Ok(())
    }
}
