//! VMware detection.
//!
//! Knocking on the backdoor port from bare metal faults the process, so the
//! knock is the last of four steps, each only reached if the cheaper one
//! before it passed:
//!
//! ```text
//!   hypervisor bit ──► vendor == VMwareVMware ──► iopl(3) ──► knock
//!        │ clear              │ other                │ EPERM      │
//!        ▼                    ▼                      ▼            ▼
//!     NotAVm         HypervisorMismatch      SetPrivilegeLevel  Confirmed / NotAVm
//! ```
//!
//! A false negative is acceptable, a crash is not. When the oracle cannot
//! answer on this platform ([`HypervisorPresence::Unknown`]) the CPU checks
//! are skipped and the knock runs unguarded.
//!
//! The privilege raise is permanent. Detecting again returns the same answer
//! but does not undo anything.

use crate::constants::VMWARE_VENDOR_ID;
use crate::error::{Error, Result};
use crate::platform::{
    CapabilityOracle, HypervisorPresence, IoPrivilege, PrivilegeEscalator, default_escalator,
    default_oracle,
};
use crate::transport::Transport;
use std::fmt;
use tracing::{debug, warn};

/// Outcome of a detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Not running under the expected hypervisor.
    NotAVm,
    /// The hypervisor answered the knock.
    Confirmed(IoPrivilege),
}

impl Detection {
    /// Returns true if the hypervisor was confirmed.
    #[must_use]
    pub fn is_vm(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    /// Returns the permit needed to start sessions, if confirmed.
    #[must_use]
    pub fn privilege(&self) -> Option<&IoPrivilege> {
        match self {
            Self::Confirmed(privilege) => Some(privilege),
            Self::NotAVm => None,
        }
    }
}

/// Runs the detection sequence.
pub struct Detector {
    oracle: Box<dyn CapabilityOracle>,
    escalator: Box<dyn PrivilegeEscalator>,
    vendor: String,
}

impl Detector {
    /// Creates a detector from an explicit oracle and escalator, expecting a VMware vendor.
    pub fn new(oracle: Box<dyn CapabilityOracle>, escalator: Box<dyn PrivilegeEscalator>) -> Self {
        Self {
            oracle,
            escalator,
            vendor: VMWARE_VENDOR_ID.to_string(),
        }
    }

    /// Creates a detector with the oracle and escalator for the current platform.
    pub fn for_current_platform() -> Self {
        Self::new(default_oracle(), default_escalator())
    }

    /// Sets the expected hypervisor vendor signature.
    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Returns the expected vendor signature.
    #[must_use]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Runs the checks that are safe on bare metal, then raises the privilege
    /// level.
    ///
    /// # Errors
    ///
    /// - [`Error::CpuIdMismatch`] if the hypervisor bit is clear
    /// - [`Error::HypervisorMismatch`] if the vendor differs
    /// - [`Error::SetPrivilegeLevel`] if the raise failed
    pub fn precheck(&self) -> Result<IoPrivilege> {
        match self.oracle.hypervisor_presence() {
            HypervisorPresence::Absent => {
                debug!(oracle = self.oracle.name(), "no hypervisor reported");
                return Err(Error::CpuIdMismatch);
            }
            HypervisorPresence::Present => {
                let found = self.oracle.hypervisor_vendor().unwrap_or_default();
                if found != self.vendor {
                    debug!(found = %found, expected = %self.vendor, "hypervisor vendor mismatch");
                    return Err(Error::HypervisorMismatch { found });
                }
            }
            HypervisorPresence::Unknown => {
                debug!(
                    oracle = self.oracle.name(),
                    "no generic hypervisor check, assuming safe"
                );
            }
        }

        self.escalator.raise().map_err(|e| {
            warn!(escalator = self.escalator.name(), error = %e, "cannot raise I/O privilege level");
            Error::SetPrivilegeLevel(e)
        })
    }

    /// Detects the hypervisor and, if confirmed, hands back the I/O permit.
    ///
    /// A clear hypervisor bit is a normal outcome and yields
    /// [`Detection::NotAVm`] without touching the escalator or `transport`.
    /// Every other early stop is returned as an error.
    pub fn detect(&self, transport: &dyn Transport) -> Result<Detection> {
        let privilege = match self.precheck() {
            Ok(privilege) => privilege,
            Err(Error::CpuIdMismatch) => return Ok(Detection::NotAVm),
            Err(e) => return Err(e),
        };

        let answered = transport.knock(&privilege)?;
        debug!(answered, "backdoor knock");

        if answered {
            Ok(Detection::Confirmed(privilege))
        } else {
            Ok(Detection::NotAVm)
        }
    }

    /// Boolean form of [`detect`](Self::detect).
    pub fn is_vm(&self, transport: &dyn Transport) -> Result<bool> {
        self.detect(transport).map(|d| d.is_vm())
    }
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("oracle", &self.oracle.name())
            .field("escalator", &self.escalator.name())
            .field("vendor", &self.vendor)
            .finish()
    }
}
