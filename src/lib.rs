//! # guestrpc
//!
//! **Guest-side VMware detection and guest RPC sessions**
//!
//! This crate lets a process inside a VMware virtual machine find out, without
//! crashing on bare metal, whether it really runs under VMware, and then talk
//! to the hypervisor over the two backdoor channels used for guest
//! management:
//!
//! - **RPCI**: request/reply commands (`info-get`, `info-set`, `SetGuestInfo`)
//! - **TCLO**: raw duplex tools-protocol channel
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            guestrpc                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────┐      ┌────────────────────────────┐   │
//! │  │        Detector          │      │   RpciSession / TcloSession│   │
//! │  │ cpuid → vendor → iopl    │      │ start → request… → stop    │   │
//! │  │         → knock          │      │ "1 " / "0 " status markers │   │
//! │  └────────────┬─────────────┘      └─────────────┬──────────────┘   │
//! │               │ IoPrivilege permit               │                  │
//! │               └───────────────┬──────────────────┘                  │
//! │                               ▼                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │             Transport / Channel (backdoor, external)          │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The backdoor transport itself is not part of this crate. Implement
//! [`Transport`] and [`Channel`] on top of it and hand it to the detector and
//! the sessions.
//!
//! # Safety Model
//!
//! - The hypervisor bit and vendor signature are checked before anything
//!   privileged happens (see [`detect`]).
//! - The I/O privilege raise is modelled as an [`IoPrivilege`] permit; opening
//!   a channel or knocking requires one.
//! - `SetGuestInfo` is best effort and never returns an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use guestrpc::{Detector, GuestInfoKind, RpciSession};
//! use std::sync::Arc;
//!
//! fn publish(transport: Arc<dyn guestrpc::Transport>) -> guestrpc::Result<()> {
//!     let detection = Detector::for_current_platform().detect(transport.as_ref())?;
//!     let Some(privilege) = detection.privilege() else {
//!         return Ok(());
//!     };
//!
//!     let mut rpci = RpciSession::new(transport);
//!     rpci.start(privilege)?;
//!     let hostname = rpci.info_get("guestinfo.hostname", "localhost")?;
//!     rpci.set_guest_info(GuestInfoKind::DnsName, hostname.as_bytes());
//!     rpci.stop()
//! }
//! ```

pub mod constants;
pub mod detect;
pub mod error;
pub mod guestinfo;
pub mod platform;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports
pub use detect::{Detection, Detector};
pub use error::{Error, Result};
pub use guestinfo::{GuestInfoId, GuestInfoKind};
pub use platform::{
    AssumeGranted, AssumeSafeOracle, CapabilityOracle, HypervisorPresence, IoPrivilege,
    PrivilegeEscalator,
};
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use platform::CpuidOracle;
#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
pub use platform::Iopl;
pub use protocol::{Command, Reply};
pub use session::{RpciSession, SessionState, TcloCallback, TcloSession};
pub use transport::{Channel, ProtocolId, Transport};
