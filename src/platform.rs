//! Platform checks used by hypervisor detection.
//!
//! Detection must rule out bare metal before anything touches the backdoor
//! port, because an `in` instruction on real hardware without I/O privilege
//! faults the process. Two checks feed the precheck:
//!
//! - [`CapabilityOracle`]: answers "is there a hypervisor?" and "whose?"
//! - [`PrivilegeEscalator`]: raises the I/O privilege level and hands back an
//!   [`IoPrivilege`] permit
//!
//! Implementations are picked at runtime by [`default_oracle`] and
//! [`default_escalator`], so the detection algorithm is identical on every
//! platform and only the checks change.
//!
//! | Platform            | Oracle              | Escalator        |
//! |---------------------|---------------------|------------------|
//! | Linux x86 / x86_64  | [`CpuidOracle`]     | `Iopl` (level 3) |
//! | everything else     | [`AssumeSafeOracle`]| [`AssumeGranted`]|
//!
//! On the second row nothing can be checked up front. The precheck accepts
//! the risk that the final knock faults.

use std::io;

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
use crate::constants::BACKDOOR_IOPL;

// =============================================================================
// Capability Oracle
// =============================================================================

/// What the CPU reports about an underlying hypervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypervisorPresence {
    /// The hypervisor feature bit is clear.
    Absent,
    /// The hypervisor feature bit is set.
    Present,
    /// No safe generic way to ask on this platform.
    Unknown,
}

/// Source of CPU capability information.
pub trait CapabilityOracle: Send + Sync {
    /// Oracle name, for logging.
    fn name(&self) -> &'static str;

    /// Reports whether the CPU runs under a hypervisor.
    fn hypervisor_presence(&self) -> HypervisorPresence;

    /// Returns the hypervisor vendor signature, if one can be read.
    fn hypervisor_vendor(&self) -> Option<String>;
}

/// Oracle backed by the `cpuid` instruction.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuidOracle;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl CpuidOracle {
    fn cpuid(leaf: u32) -> (u32, u32, u32, u32) {
        #[cfg(target_arch = "x86")]
        use std::arch::x86::__cpuid;
        #[cfg(target_arch = "x86_64")]
        use std::arch::x86_64::__cpuid;

        // SAFETY: cpuid is available on every CPU Rust supports for these
        // targets and has no side effects.
        #[allow(unused_unsafe)]
        let r = unsafe { __cpuid(leaf) };
        (r.eax, r.ebx, r.ecx, r.edx)
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl CapabilityOracle for CpuidOracle {
    fn name(&self) -> &'static str {
        "cpuid"
    }

    fn hypervisor_presence(&self) -> HypervisorPresence {
        use crate::constants::{CPUID_FEATURE_HYPERVISOR, CPUID_FEATURE_LEAF};

        let (_, _, ecx, _) = Self::cpuid(CPUID_FEATURE_LEAF);
        if ecx & CPUID_FEATURE_HYPERVISOR == 0 {
            HypervisorPresence::Absent
        } else {
            HypervisorPresence::Present
        }
    }

    fn hypervisor_vendor(&self) -> Option<String> {
        use crate::constants::CPUID_HYPERVISOR_VENDOR_LEAF;

        let (_, ebx, ecx, edx) = Self::cpuid(CPUID_HYPERVISOR_VENDOR_LEAF);
        let mut sig = Vec::with_capacity(12);
        sig.extend_from_slice(&ebx.to_le_bytes());
        sig.extend_from_slice(&ecx.to_le_bytes());
        sig.extend_from_slice(&edx.to_le_bytes());

        let vendor = String::from_utf8_lossy(&sig)
            .trim_end_matches('\0')
            .to_string();
        (!vendor.is_empty()).then_some(vendor)
    }
}

/// Oracle for platforms without a safe hypervisor check.
///
/// Always answers [`HypervisorPresence::Unknown`], which makes the detector
/// skip the CPU checks and go straight to the knock.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeSafeOracle;

impl CapabilityOracle for AssumeSafeOracle {
    fn name(&self) -> &'static str {
        "assume-safe"
    }

    fn hypervisor_presence(&self) -> HypervisorPresence {
        HypervisorPresence::Unknown
    }

    fn hypervisor_vendor(&self) -> Option<String> {
        None
    }
}

// =============================================================================
// Privilege
// =============================================================================

/// Permit proving the process may issue backdoor I/O.
///
/// Produced by a [`PrivilegeEscalator`] once the raise succeeded. The raise is
/// never undone, so the permit stays valid for the rest of the process.
/// Opening transport channels requires one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoPrivilege {
    level: u8,
}

impl IoPrivilege {
    /// Records that the I/O privilege level is now `level`.
    ///
    /// # Safety
    ///
    /// The caller must have raised the process I/O privilege level to
    /// `level` (or run on a platform where backdoor I/O needs no raise).
    /// Transports trust the permit and issue port I/O, which faults the
    /// process when the privilege is missing.
    #[must_use]
    pub unsafe fn granted(level: u8) -> Self {
        Self { level }
    }

    /// Returns the granted I/O privilege level.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }
}

/// Raises the process I/O privilege level.
pub trait PrivilegeEscalator: Send + Sync {
    /// Escalator name, for logging.
    fn name(&self) -> &'static str;

    /// Raises the privilege level. Irreversible for the process lifetime.
    fn raise(&self) -> io::Result<IoPrivilege>;
}

/// Escalator calling `iopl(2)` with level 3.
///
/// The outcome of the first call is kept for the whole process; later calls
/// replay it without issuing the syscall again.
#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct Iopl;

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
static IOPL_OUTCOME: std::sync::OnceLock<std::result::Result<(), i32>> =
    std::sync::OnceLock::new();

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
impl PrivilegeEscalator for Iopl {
    fn name(&self) -> &'static str {
        "iopl"
    }

    fn raise(&self) -> io::Result<IoPrivilege> {
        let outcome = IOPL_OUTCOME.get_or_init(|| {
            // SAFETY: iopl only changes the I/O permission level of the
            // calling process; it touches no memory owned by Rust.
            let rc = unsafe { libc::syscall(libc::SYS_iopl, libc::c_long::from(BACKDOOR_IOPL)) };
            if rc == 0 {
                tracing::debug!(level = BACKDOOR_IOPL, "raised I/O privilege level");
                Ok(())
            } else {
                Err(io::Error::last_os_error()
                    .raw_os_error()
                    .unwrap_or(libc::EPERM))
            }
        });

        match outcome {
            // SAFETY: iopl(3) succeeded for this process.
            Ok(()) => Ok(unsafe { IoPrivilege::granted(BACKDOOR_IOPL) }),
            Err(errno) => Err(io::Error::from_raw_os_error(*errno)),
        }
    }
}

/// Escalator for platforms without an I/O privilege level to raise.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeGranted;

impl PrivilegeEscalator for AssumeGranted {
    fn name(&self) -> &'static str {
        "assume-granted"
    }

    fn raise(&self) -> io::Result<IoPrivilege> {
        // SAFETY: used where no privilege level exists to raise; the knock
        // runs unguarded on these platforms.
        Ok(unsafe { IoPrivilege::granted(0) })
    }
}

// =============================================================================
// Platform Selection
// =============================================================================

/// Returns the capability oracle for the current platform.
pub fn default_oracle() -> Box<dyn CapabilityOracle> {
    #[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
    return Box::new(CpuidOracle);

    #[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
    return Box::new(AssumeSafeOracle);
}

/// Returns the privilege escalator for the current platform.
pub fn default_escalator() -> Box<dyn PrivilegeEscalator> {
    #[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
    return Box::new(Iopl);

    #[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
    return Box::new(AssumeGranted);
}
