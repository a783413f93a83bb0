//! RPCI: request/reply guest RPC.
//!
//! Each request is sent verbatim and answered by exactly one reply. The
//! two-byte status marker is stripped and turned into [`Reply::ok`].
//!
//! # Example
//!
//! ```rust,ignore
//! use guestrpc::{Detector, GuestInfoKind, RpciSession};
//!
//! let detection = Detector::for_current_platform().detect(transport.as_ref())?;
//! let Some(privilege) = detection.privilege() else {
//!     return Ok(());
//! };
//!
//! let mut rpci = RpciSession::new(transport.clone());
//! rpci.start(privilege)?;
//! let config = rpci.info_get("guestinfo.ignition.config.data", "")?;
//! rpci.set_guest_info(GuestInfoKind::BuildNumber, b"1234");
//! rpci.stop()?;
//! ```

use super::{Link, SessionState};
use crate::error::{Error, Result};
use crate::guestinfo::GuestInfoId;
use crate::platform::IoPrivilege;
use crate::protocol::{Command, Reply};
use crate::transport::{ProtocolId, Transport};
use std::sync::Arc;
use tracing::{Span, debug, debug_span, error, trace, warn};

/// Session on the RPCI channel.
///
/// Dropping a started session closes the channel best effort.
#[derive(Debug)]
pub struct RpciSession {
    link: Link,
    span: Span,
}

impl RpciSession {
    /// Creates a session that will open its channel on `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let span = debug_span!("rpci");
        debug!(parent: &span, "initializing");

        Self {
            link: Link::new(ProtocolId::RPCI, transport),
            span,
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.link.state
    }

    /// Opens the RPCI channel.
    pub fn start(&mut self, privilege: &IoPrivilege) -> Result<()> {
        let _guard = self.span.clone().entered();
        debug!("starting");
        self.link.start(privilege)
    }

    /// Closes the RPCI channel.
    ///
    /// Fails with [`Error::NoChannel`] when the session was never started or
    /// is already stopped.
    pub fn stop(&mut self) -> Result<()> {
        let _guard = self.span.clone().entered();
        debug!("closing");
        self.link.stop()
    }

    /// Sends `request` and classifies the single reply.
    pub fn request(&mut self, request: &[u8]) -> Result<Reply> {
        let _guard = self.span.clone().entered();
        self.exchange(request)
    }

    fn exchange(&mut self, request: &[u8]) -> Result<Reply> {
        self.link.send(request)?;
        let raw = self.link.receive()?;

        match Reply::parse(&raw) {
            Some(reply) => Ok(reply),
            None => Err(Error::MalformedReply {
                request: request.to_vec(),
                reply: raw,
            }),
        }
    }

    /// Reads a property, e.g. a `guestinfo.*` ExtraConfig key.
    ///
    /// A missing key is not an error: when the hypervisor answers with the
    /// failure marker, `default` is returned. The value is decoded as UTF-8;
    /// invalid bytes are replaced with U+FFFD. Use [`request`](Self::request)
    /// to get the raw bytes.
    pub fn info_get(&mut self, key: &str, default: &str) -> Result<String> {
        let _guard = self.span.clone().entered();
        let reply = self.exchange(&Command::InfoGet { key }.encode());
        debug!(
            cmd = "info-get",
            key,
            ok = reply.as_ref().is_ok_and(|r| r.ok),
            "requested"
        );

        let reply = reply?;
        if !reply.ok {
            return Ok(default.to_string());
        }
        Ok(reply.text())
    }

    /// Writes a property. Returns the hypervisor's success flag.
    pub fn info_set(&mut self, key: &str, value: &str) -> Result<bool> {
        let _guard = self.span.clone().entered();
        let reply = self.exchange(&Command::InfoSet { key, value }.encode());
        debug!(
            cmd = "info-set",
            key,
            ok = reply.as_ref().is_ok_and(|r| r.ok),
            "requested"
        );

        Ok(reply?.ok)
    }

    /// Publishes a guest-info property. Best effort.
    ///
    /// Guest info is advisory telemetry with no recovery path, so this never
    /// reports failure to the caller. Transport errors are logged at `error`,
    /// a failure reply at `warn`.
    pub fn set_guest_info(&mut self, kind: impl Into<GuestInfoId>, data: &[u8]) {
        let _guard = self.span.clone().entered();
        let kind = kind.into();
        let msg = Command::SetGuestInfo { kind, data }.encode();
        trace!(
            cmd = "SetGuestInfo",
            kind = %kind,
            msg = %msg.escape_ascii(),
            "setting"
        );

        match self.exchange(&msg) {
            Ok(reply) if !reply.ok => {
                warn!(kind = %kind, reply = %reply.text(), "request returned not OK");
            }
            Ok(_) => {}
            Err(e) => {
                error!(kind = %kind, error = %e, "error sending guestinfo");
            }
        }
    }

    /// Sends raw bytes on the RPCI channel.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        let _guard = self.span.clone().entered();
        self.link.send(data)
    }

    /// Receives raw bytes from the RPCI channel.
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        let _guard = self.span.clone().entered();
        self.link.receive()
    }
}
