//! Sessions over backdoor channels.
//!
//! A session owns at most one channel and moves through a fixed lifecycle:
//!
//! ```text
//!   ┌───────────────┐  start   ┌─────────┐  stop   ┌─────────┐
//!   │ Uninitialized │ ───────► │ Started │ ──────► │ Stopped │
//!   └───────────────┘          └─────────┘         └─────────┘
//! ```
//!
//! I/O is only valid in `Started`. Starting twice or restarting a stopped
//! session is rejected with [`Error::InvalidState`]; I/O or `stop` without an
//! open channel fails with [`Error::NoChannel`] before touching the transport.
//!
//! Dropping a started session closes its channel and discards any close
//! error; call `stop` to observe it.
//!
//! Every I/O method takes `&mut self`, so a session has at most one request
//! in flight. Share a session across threads behind a `Mutex`.

mod rpci;
mod tclo;

pub use rpci::RpciSession;
pub use tclo::{TcloCallback, TcloSession};

use crate::error::{Error, Result};
use crate::platform::IoPrivilege;
use crate::transport::{Channel, ProtocolId, Transport};
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, channel not opened yet.
    Uninitialized,
    /// Channel open, I/O allowed.
    Started,
    /// Channel closed. Terminal.
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Channel ownership and lifecycle shared by both session kinds.
struct Link {
    protocol: ProtocolId,
    transport: Arc<dyn Transport>,
    channel: Option<Box<dyn Channel>>,
    state: SessionState,
}

impl Link {
    fn new(protocol: ProtocolId, transport: Arc<dyn Transport>) -> Self {
        Self {
            protocol,
            transport,
            channel: None,
            state: SessionState::Uninitialized,
        }
    }

    fn start(&mut self, privilege: &IoPrivilege) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(Error::InvalidState {
                state: self.state.to_string(),
                expected: SessionState::Uninitialized.to_string(),
            });
        }

        let channel = self.transport.open(self.protocol, privilege)?;
        self.channel = Some(channel);
        self.state = SessionState::Started;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let channel = self.channel.take().ok_or(Error::NoChannel)?;
        self.state = SessionState::Stopped;
        channel.close()?;
        Ok(())
    }

    fn channel(&mut self) -> Result<&mut Box<dyn Channel>> {
        self.channel.as_mut().ok_or(Error::NoChannel)
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.channel()?.send(data)?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        Ok(self.channel()?.receive()?)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close() {
                tracing::debug!(protocol = %self.protocol, error = %e, "close on drop failed");
            }
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("protocol", &self.protocol)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
