//! Runtime configuration parameters.

use std::env;
use std::ops::{BitOr, BitOrAssign};

/// Alignment guaranteed by the CUDA runtime for pinned host allocations.
///
/// Element types with a stricter alignment are rejected by the allocator.
pub const PINNED_ALIGNMENT: usize = 256;

/// Smallest non-zero capacity a container grows to.
///
/// Pinned allocations are expensive system calls, so tiny containers skip
/// the 1 → 2 → 4 steps.
pub const MIN_NON_ZERO_CAPACITY: usize = 4;

/// Environment variable naming an extra CUDA runtime library to try first.
pub const CUDART_ENV: &str = "PINMEM_CUDART";

/// Flags passed to `cudaHostAlloc`.
///
/// [`HostAllocFlags::DEFAULT`] is exactly `cudaMallocHost` semantics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HostAllocFlags(u32);

impl HostAllocFlags {
    /// `cudaHostAllocDefault`.
    pub const DEFAULT: Self = Self(0x00);
    /// `cudaHostAllocPortable`: pinned for every CUDA context, not only the
    /// current one.
    pub const PORTABLE: Self = Self(0x01);
    /// `cudaHostAllocMapped`: also map the allocation into the device
    /// address space.
    pub const MAPPED: Self = Self(0x02);
    /// `cudaHostAllocWriteCombined`: faster host-to-device transfers, very
    /// slow host reads.
    pub const WRITE_COMBINED: Self = Self(0x04);

    /// Raw flag bits as passed to the runtime.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for HostAllocFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for HostAllocFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Configuration for loading the CUDA runtime library.
///
/// The library is loaded once per process; the first configuration used
/// wins (see [`CudaRuntime::init`](crate::CudaRuntime::init)).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Library names or paths tried in order.
    pub library_candidates: Vec<String>,
    /// Flags for every allocation made by runtimes built from this config.
    pub flags: HostAllocFlags,
}

impl RuntimeConfig {
    /// Platform default CUDA runtime library names, newest first.
    #[cfg(target_os = "linux")]
    pub const DEFAULT_LIBRARIES: &'static [&'static str] =
        &["libcudart.so.12", "libcudart.so.11.0", "libcudart.so"];

    /// Platform default CUDA runtime library names, newest first.
    #[cfg(target_os = "windows")]
    pub const DEFAULT_LIBRARIES: &'static [&'static str] =
        &["cudart64_12.dll", "cudart64_110.dll"];

    /// Platform default CUDA runtime library names, newest first.
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    pub const DEFAULT_LIBRARIES: &'static [&'static str] = &[];

    /// Default candidates and default allocation flags.
    pub fn new() -> Self {
        Self {
            library_candidates: Self::DEFAULT_LIBRARIES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            flags: HostAllocFlags::DEFAULT,
        }
    }

    /// Defaults, with the library named by `PINMEM_CUDART` tried first.
    pub fn from_env() -> Self {
        let config = Self::new();
        match env::var(CUDART_ENV) {
            Ok(path) if !path.is_empty() => config.with_library(path),
            _ => config,
        }
    }

    /// Try `library` before every other candidate.
    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library_candidates.insert(0, library.into());
        self
    }

    /// Replace the allocation flags.
    pub fn with_flags(mut self, flags: HostAllocFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_match_malloc_host() {
        assert_eq!(HostAllocFlags::default().bits(), 0);
        assert_eq!(RuntimeConfig::new().flags, HostAllocFlags::DEFAULT);
    }

    #[test]
    fn flags_combine() {
        let mut flags = HostAllocFlags::PORTABLE | HostAllocFlags::MAPPED;
        assert_eq!(flags.bits(), 0x03);
        assert!(flags.contains(HostAllocFlags::PORTABLE));
        assert!(!flags.contains(HostAllocFlags::WRITE_COMBINED));
        flags |= HostAllocFlags::WRITE_COMBINED;
        assert_eq!(flags.bits(), 0x07);
    }

    #[test]
    fn with_library_is_tried_first() {
        let config = RuntimeConfig::new().with_library("/opt/cuda/lib64/libcudart.so");
        assert_eq!(config.library_candidates[0], "/opt/cuda/lib64/libcudart.so");
        assert_eq!(
            config.library_candidates.len(),
            RuntimeConfig::DEFAULT_LIBRARIES.len() + 1
        );
    }

    #[test]
    fn pinned_alignment_is_a_power_of_two() {
        assert!(PINNED_ALIGNMENT.is_power_of_two());
        assert!(MIN_NON_ZERO_CAPACITY > 0);
    }
}
