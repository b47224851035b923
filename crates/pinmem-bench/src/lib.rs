//! Benchmark profiles for pinned host memory containers.
//!
//! - [`STAGING_SIZES`]: element counts from one page up to a typical
//!   transfer batch
//! - [`cuda_for_bench`]: the CUDA runtime, or `None` when it cannot be
//!   loaded so the CUDA cases are skipped
//! - [`fill_ramp`]: deterministic contents for copy benchmarks

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use pinmem_alloc::{CudaRuntime, RuntimeConfig};

/// Element counts benchmarked for `f32` staging buffers: 4 KiB, 256 KiB and
/// 4 MiB.
pub const STAGING_SIZES: [usize; 3] = [1 << 10, 1 << 16, 1 << 20];

/// Load the CUDA runtime from the environment's configuration.
///
/// Returns `None` (and prints why) on machines without it, so benchmarks
/// against the real runtime can be skipped instead of failing.
pub fn cuda_for_bench() -> Option<CudaRuntime> {
    match CudaRuntime::init(&RuntimeConfig::from_env()) {
        Ok(rt) => Some(rt),
        Err(fault) => {
            eprintln!("skipping CUDA benchmarks: {}", fault.message);
            None
        }
    }
}

/// Fill `data` with `0.0, 0.5, 1.0, ...`.
pub fn fill_ramp(data: &mut [f32]) {
    for (i, x) in data.iter_mut().enumerate() {
        *x = i as f32 * 0.5;
    }
}
