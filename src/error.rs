//! Error types for hypervisor detection and guest RPC sessions.

/// Result type alias for guest RPC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while detecting the hypervisor or talking to it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Detection Errors
    // =========================================================================
    /// CPUID does not report a hypervisor.
    #[error("CPUID does not report a hypervisor")]
    CpuIdMismatch,

    /// A hypervisor is present but it is not the expected vendor.
    #[error("hypervisor vendor mismatch: found '{found}'")]
    HypervisorMismatch { found: String },

    /// The I/O privilege level could not be raised.
    #[error("failed to set I/O privilege level: {0}")]
    SetPrivilegeLevel(#[source] std::io::Error),

    // =========================================================================
    // Session State Errors
    // =========================================================================
    /// Operation attempted without an open channel (before start or after stop).
    #[error("no channel available: session not started or already stopped")]
    NoChannel,

    /// Session is in the wrong state for the operation.
    #[error("session is in state '{state}', expected '{expected}'")]
    InvalidState { state: String, expected: String },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Reply did not start with a recognized status marker.
    #[error(
        "malformed reply to request \"{}\": \"{}\"",
        .request.escape_ascii(),
        .reply.escape_ascii()
    )]
    MalformedReply { request: Vec<u8>, reply: Vec<u8> },

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Failure reported by the underlying transport channel.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
