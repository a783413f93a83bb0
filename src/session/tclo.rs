//! TCLO: raw duplex tools-protocol channel.
//!
//! No framing and no status markers. The command loop that reads a command,
//! dispatches it by prefix, and sends back the handler's reply belongs to the
//! caller; [`TcloCallback`] names the handler shape.

use super::{Link, SessionState};
use crate::error::Result;
use crate::platform::IoPrivilege;
use crate::transport::{ProtocolId, Transport};
use std::sync::Arc;
use tracing::{Span, debug, debug_span};

/// Handler for one TCLO command; returns the reply to send back.
pub type TcloCallback = Box<dyn FnMut(&str) -> Result<String> + Send>;

/// Session on the TCLO channel.
///
/// Dropping a started session closes the channel best effort.
#[derive(Debug)]
pub struct TcloSession {
    link: Link,
    span: Span,
}

impl TcloSession {
    /// Creates a session that will open its channel on `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let span = debug_span!("tclo");
        debug!(parent: &span, "initializing");

        Self {
            link: Link::new(ProtocolId::TCLO, transport),
            span,
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.link.state
    }

    /// Opens the TCLO channel.
    pub fn start(&mut self, privilege: &IoPrivilege) -> Result<()> {
        let _guard = self.span.clone().entered();
        debug!("starting");
        self.link.start(privilege)
    }

    /// Closes the TCLO channel.
    pub fn stop(&mut self) -> Result<()> {
        let _guard = self.span.clone().entered();
        debug!("closing");
        self.link.stop()
    }

    /// Sends data over TCLO.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        let _guard = self.span.clone().entered();
        self.link.send(data)
    }

    /// Receives data over TCLO.
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        let _guard = self.span.clone().entered();
        self.link.receive()
    }
}
