//! Allocator errors -> Python exceptions.
//!
//! Exception messages carry the runtime's diagnostic string unchanged.

use pyo3::create_exception;
use pyo3::exceptions::{PyMemoryError, PyRuntimeError};
use pyo3::PyErr;

use pinmem_core::BufferError;

create_exception!(
    pinmem,
    AllocationError,
    PyMemoryError,
    "Pinned host memory could not be acquired."
);
create_exception!(
    pinmem,
    DeallocationError,
    PyRuntimeError,
    "Pinned host memory could not be released."
);

/// Map an acquisition failure to `AllocationError`.
pub(crate) fn allocation_error(err: pinmem_core::AllocationError) -> PyErr {
    AllocationError::new_err(err.message)
}

/// Map a release failure to `DeallocationError`.
pub(crate) fn deallocation_error(err: pinmem_core::DeallocationError) -> PyErr {
    DeallocationError::new_err(err.message)
}

/// Map a growth failure to whichever exception matches its half.
pub(crate) fn buffer_error(err: BufferError) -> PyErr {
    match err {
        BufferError::Allocation(e) => allocation_error(e),
        BufferError::Deallocation(e) => deallocation_error(e),
    }
}
