//! Transport contract consumed by the detector and the sessions.
//!
//! The backdoor itself (port I/O, message chunking, channel handshake) lives
//! outside this crate. Sessions only need a duplex byte conduit bound to a
//! protocol id, and the detector only needs a single yes/no knock.
//!
//! ```text
//!   RpciSession / TcloSession          Detector
//!            │                            │
//!            │ open(protocol, &permit)    │ knock(&permit)
//!            ▼                            ▼
//!   ┌────────────────────────────────────────────┐
//!   │ Transport (backdoor implementation)        │
//!   │   Channel: send / receive / close          │
//!   └────────────────────────────────────────────┘
//! ```
//!
//! Both entry points take an [`IoPrivilege`] permit so that no backdoor I/O
//! can be issued before the precheck has raised the privilege level.

use crate::platform::IoPrivilege;
use std::fmt;
use std::io;

/// Protocol identifier a channel is bound to.
///
/// Opaque to this crate; the values are the ASCII tags the hypervisor expects,
/// read as little-endian integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolId(pub u32);

impl ProtocolId {
    /// Request/reply guest RPC channel ("RPCI").
    pub const RPCI: Self = Self(0x4943_5052);

    /// Duplex tools-protocol channel ("TCLO").
    pub const TCLO: Self = Self(0x4f4c_4354);

    /// Returns a short name for known protocols.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match *self {
            Self::RPCI => "rpci",
            Self::TCLO => "tclo",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#010x})", self.name(), self.0)
    }
}

/// An open, protocol-bound duplex channel.
///
/// Calls block until the hypervisor completes the operation or it fails.
pub trait Channel: Send {
    /// Sends one message.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Receives one message.
    fn receive(&mut self) -> io::Result<Vec<u8>>;

    /// Closes the channel, consuming it.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Factory for channels, plus the detection knock.
pub trait Transport: Send + Sync {
    /// Opens a channel bound to `protocol`.
    fn open(&self, protocol: ProtocolId, privilege: &IoPrivilege) -> io::Result<Box<dyn Channel>>;

    /// Knocks on the backdoor and reports whether the hypervisor answered.
    fn knock(&self, privilege: &IoPrivilege) -> io::Result<bool>;
}
