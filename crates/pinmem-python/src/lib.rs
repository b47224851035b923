//! Python bindings for pinned host memory vectors.
//!
//! The native extension is named `_pinmem`. For each supported element type
//! it exposes a pageable vector (ordinary heap memory) and a pinned vector
//! (page-locked memory from the CUDA runtime), both constructible with a
//! count and both viewable as a NumPy array that aliases the buffer.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![allow(unsafe_code)]

use pyo3::prelude::*;

mod error;
mod vector;

/// The native `_pinmem` extension module.
#[pymodule]
fn _pinmem(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Exceptions
    m.add("AllocationError", m.py().get_type::<error::AllocationError>())?;
    m.add(
        "DeallocationError",
        m.py().get_type::<error::DeallocationError>(),
    )?;

    // Vector classes
    vector::register(m)?;

    m.add_function(wrap_pyfunction!(cuda_available, m)?)?;
    Ok(())
}

/// Returns `True` if the CUDA runtime library could be loaded.
///
/// Pinned vectors can only be constructed when this is true.
#[pyfunction]
fn cuda_available(py: Python<'_>) -> bool {
    py.detach(pinmem_alloc::CudaRuntime::is_available)
}
