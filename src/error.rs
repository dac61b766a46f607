use thiserror::Error;

/// Failure modes of bus operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// Handle resolution failed: the index is out of range, the slot is
    /// closed, or the slot's generation advanced while the caller was
    /// suspended. Not retryable for that handle.
    #[error("no such channel")]
    NoChannel,

    /// A non-blocking operation found the channel full (send side) or
    /// empty (recv side). Retryable.
    #[error("operation would block")]
    WouldBlock,
}

/// C-visible projection of the error state, recorded in the thread-local
/// last-error slot by every entry point in [`crate::ffi`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    None = 0,
    NoChannel = 1,
    WouldBlock = 2,
}

impl BusError {
    /// The FFI code reported for this error.
    pub fn code(self) -> ErrorCode {
        match self {
            BusError::NoChannel => ErrorCode::NoChannel,
            BusError::WouldBlock => ErrorCode::WouldBlock,
        }
    }
}
