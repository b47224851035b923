//! Error types for pinned host memory management.
//!
//! The runtime reports raw failures as [`RuntimeFault`]; the allocator turns
//! them into [`AllocationError`] or [`DeallocationError`], keeping the
//! runtime's diagnostic string verbatim. Container growth can hit either,
//! so it reports [`BufferError`].

use thiserror::Error;

/// A failure reported by the accelerator runtime's pinned-memory primitives.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} (runtime code {code})")]
pub struct RuntimeFault {
    /// Native error code from the runtime, or a negative value for
    /// failures detected before the runtime was reached.
    pub code: i32,
    /// Native diagnostic string, unmodified.
    pub message: String,
}

impl RuntimeFault {
    /// Code used when the runtime library could not be loaded at all.
    pub const UNAVAILABLE: i32 = -1;

    /// Create a fault from a runtime code and its diagnostic string.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Pinned-memory acquisition failed.
///
/// Out of pinned pool, invalid size, runtime not initialised or not
/// loadable. No partial allocation is left behind.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("pinned allocation of {requested_bytes} bytes failed: {message}")]
pub struct AllocationError {
    /// Size of the request in bytes (saturated if the size computation
    /// itself overflowed).
    pub requested_bytes: usize,
    /// Diagnostic message from the runtime.
    pub message: String,
}

impl AllocationError {
    /// Build an error for a request of `requested_bytes`.
    pub fn new(requested_bytes: usize, message: impl Into<String>) -> Self {
        Self {
            requested_bytes,
            message: message.into(),
        }
    }

    /// The element count times element size does not fit in `usize`.
    pub fn capacity_overflow() -> Self {
        Self::new(usize::MAX, "capacity overflow")
    }
}

impl From<(usize, RuntimeFault)> for AllocationError {
    fn from((requested_bytes, fault): (usize, RuntimeFault)) -> Self {
        Self::new(requested_bytes, fault.message)
    }
}

/// Pinned-memory release failed (invalid pointer, runtime torn down).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("pinned deallocation failed: {message}")]
pub struct DeallocationError {
    /// Diagnostic message from the runtime.
    pub message: String,
}

impl DeallocationError {
    /// Build an error carrying the runtime's message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<RuntimeFault> for DeallocationError {
    fn from(fault: RuntimeFault) -> Self {
        Self::new(fault.message)
    }
}

/// Errors from container operations that may both acquire and release
/// memory (growth).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Acquiring the new buffer failed; the container is unchanged.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    /// Releasing the old buffer failed; the container already lives in the
    /// new buffer.
    #[error(transparent)]
    Deallocation(#[from] DeallocationError),
}

impl BufferError {
    /// Returns `true` if this is an acquisition failure.
    pub fn is_allocation(&self) -> bool {
        matches!(self, Self::Allocation(_))
    }

    /// The runtime's diagnostic message, whichever side failed.
    pub fn message(&self) -> &str {
        match self {
            Self::Allocation(e) => &e.message,
            Self::Deallocation(e) => &e.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_error_keeps_runtime_message_verbatim() {
        let fault = RuntimeFault::new(2, "out of memory");
        let err = AllocationError::from((1024, fault));
        assert_eq!(err.message, "out of memory");
        assert_eq!(err.requested_bytes, 1024);
        assert_eq!(
            err.to_string(),
            "pinned allocation of 1024 bytes failed: out of memory"
        );
    }

    #[test]
    fn deallocation_error_keeps_runtime_message_verbatim() {
        let err = DeallocationError::from(RuntimeFault::new(1, "invalid argument"));
        assert_eq!(err.message, "invalid argument");
        assert!(err.to_string().contains("invalid argument"));
    }

    #[test]
    fn buffer_error_is_transparent() {
        let alloc = BufferError::from(AllocationError::new(8, "boom"));
        assert!(alloc.is_allocation());
        assert_eq!(alloc.message(), "boom");
        assert_eq!(
            alloc.to_string(),
            AllocationError::new(8, "boom").to_string()
        );

        let dealloc = BufferError::from(DeallocationError::new("gone"));
        assert!(!dealloc.is_allocation());
        assert_eq!(dealloc.message(), "gone");
    }

    #[test]
    fn capacity_overflow_saturates_request() {
        let err = AllocationError::capacity_overflow();
        assert_eq!(err.requested_bytes, usize::MAX);
        assert_eq!(err.message, "capacity overflow");
    }

    #[test]
    fn runtime_fault_display_includes_code() {
        let fault = RuntimeFault::new(RuntimeFault::UNAVAILABLE, "no libcudart");
        assert_eq!(fault.to_string(), "no libcudart (runtime code -1)");
    }
}
