//! CUDA runtime bindings for pinned host memory.
//!
//! The CUDA runtime library (`libcudart`) is loaded dynamically the first
//! time it is needed, so the workspace builds and its tests run on machines
//! without CUDA. Only three entry points are used: `cudaHostAlloc`,
//! `cudaFreeHost` and `cudaGetErrorString`.

#![allow(unsafe_code)]

use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

use pinmem_core::RuntimeFault;

use crate::config::{HostAllocFlags, RuntimeConfig};
use crate::runtime::HostRuntime;

/// `cudaError_t`.
type CudaError = c_int;

const CUDA_SUCCESS: CudaError = 0;

type FnCudaHostAlloc =
    unsafe extern "C" fn(p_host: *mut *mut c_void, size: usize, flags: c_uint) -> CudaError;
type FnCudaFreeHost = unsafe extern "C" fn(ptr: *mut c_void) -> CudaError;
type FnCudaGetErrorString = unsafe extern "C" fn(error: CudaError) -> *const c_char;

/// Entry points resolved from the runtime library.
struct CudartApi {
    host_alloc: FnCudaHostAlloc,
    free_host: FnCudaFreeHost,
    get_error_string: FnCudaGetErrorString,
    library: String,
    /// Keeps the function pointers above valid.
    _lib: libloading::Library,
}

impl CudartApi {
    fn fault(&self, code: CudaError) -> RuntimeFault {
        // SAFETY: cudaGetErrorString accepts any code and returns a pointer to
        // a static NUL-terminated string (or null on very old runtimes).
        let message = unsafe {
            let s = (self.get_error_string)(code);
            if s.is_null() {
                format!("CUDA error {code}")
            } else {
                CStr::from_ptr(s).to_string_lossy().into_owned()
            }
        };
        RuntimeFault::new(code, message)
    }
}

static CUDART: OnceLock<Result<CudartApi, String>> = OnceLock::new();

fn load(config: &RuntimeConfig) -> Result<CudartApi, String> {
    let mut failures = Vec::with_capacity(config.library_candidates.len());
    for name in &config.library_candidates {
        tracing::debug!(library = %name, "attempting to load CUDA runtime");
        match try_load(name) {
            Ok(api) => {
                tracing::debug!(library = %name, "loaded CUDA runtime");
                return Ok(api);
            }
            Err(e) => failures.push(format!("{name}: {e}")),
        }
    }
    let reason = if failures.is_empty() {
        "no CUDA runtime library candidates configured".to_owned()
    } else {
        format!("CUDA runtime library not available ({})", failures.join("; "))
    };
    tracing::debug!(%reason, "CUDA runtime unavailable");
    Err(reason)
}

fn try_load(name: &str) -> Result<CudartApi, libloading::Error> {
    // SAFETY: loading libcudart runs its initialisers, which have no
    // preconditions. The symbol types below match the CUDA runtime ABI.
    unsafe {
        let lib = libloading::Library::new(name)?;
        let host_alloc = *lib.get::<FnCudaHostAlloc>(b"cudaHostAlloc\0")?;
        let free_host = *lib.get::<FnCudaFreeHost>(b"cudaFreeHost\0")?;
        let get_error_string = *lib.get::<FnCudaGetErrorString>(b"cudaGetErrorString\0")?;
        Ok(CudartApi {
            host_alloc,
            free_host,
            get_error_string,
            library: name.to_owned(),
            _lib: lib,
        })
    }
}

fn api() -> Result<&'static CudartApi, RuntimeFault> {
    CUDART
        .get_or_init(|| load(&RuntimeConfig::from_env()))
        .as_ref()
        .map_err(|reason| RuntimeFault::new(RuntimeFault::UNAVAILABLE, reason.clone()))
}

/// The CUDA runtime as a [`HostRuntime`].
///
/// A zero-cost handle: the loaded library is process-wide. Each handle
/// carries the [`HostAllocFlags`] its allocations are made with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CudaRuntime {
    flags: HostAllocFlags,
}

impl CudaRuntime {
    /// A handle allocating with `cudaMallocHost` semantics.
    pub const fn new() -> Self {
        Self {
            flags: HostAllocFlags::DEFAULT,
        }
    }

    /// A handle allocating with the given `cudaHostAlloc` flags.
    pub const fn with_flags(flags: HostAllocFlags) -> Self {
        Self { flags }
    }

    /// A handle using `config`'s flags.
    ///
    /// Does not load the library; see [`CudaRuntime::init`].
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::with_flags(config.flags)
    }

    /// Load the runtime library using `config`.
    ///
    /// Loading happens at most once per process. If the library was already
    /// loaded (explicitly or by a previous allocation), `config` is ignored
    /// and the outcome of the first load is reported.
    pub fn init(config: &RuntimeConfig) -> Result<Self, RuntimeFault> {
        CUDART
            .get_or_init(|| load(config))
            .as_ref()
            .map_err(|reason| RuntimeFault::new(RuntimeFault::UNAVAILABLE, reason.clone()))?;
        Ok(Self::from_config(config))
    }

    /// Returns `true` if the runtime library is (or can be) loaded.
    pub fn is_available() -> bool {
        api().is_ok()
    }

    /// Name of the library that was loaded, if any.
    pub fn loaded_library() -> Option<&'static str> {
        api().ok().map(|api| api.library.as_str())
    }

    /// Allocation flags of this handle.
    pub const fn flags(&self) -> HostAllocFlags {
        self.flags
    }
}

impl HostRuntime for CudaRuntime {
    fn name(&self) -> &'static str {
        "cuda"
    }

    fn acquire_pinned(&self, byte_count: usize) -> Result<NonNull<u8>, RuntimeFault> {
        let api = api()?;
        let mut host: *mut c_void = ptr::null_mut();
        // SAFETY: `host` is a valid out-pointer; the runtime either writes a
        // pointer to `byte_count` pinned bytes into it or reports an error.
        let code = unsafe { (api.host_alloc)(&mut host, byte_count, self.flags.bits()) };
        if code != CUDA_SUCCESS {
            return Err(api.fault(code));
        }
        NonNull::new(host.cast::<u8>())
            .ok_or_else(|| RuntimeFault::new(code, "cudaHostAlloc returned a null pointer"))
    }

    unsafe fn release_pinned(&self, ptr: NonNull<u8>) -> Result<(), RuntimeFault> {
        let api = api()?;
        // SAFETY: the caller guarantees `ptr` came from cudaHostAlloc and is
        // released once.
        let code = unsafe { (api.free_host)(ptr.as_ptr().cast::<c_void>()) };
        if code != CUDA_SUCCESS {
            return Err(api.fault(code));
        }
        Ok(())
    }
}
