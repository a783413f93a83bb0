//! # Protocol Constants
//!
//! Vendor signatures, CPUID leaves, and wire markers shared by the detector
//! and the sessions. These are the single source of truth for every byte
//! sequence this crate compares against or emits.

// =============================================================================
// CPUID
// =============================================================================

/// CPUID leaf with the processor feature bits.
pub const CPUID_FEATURE_LEAF: u32 = 0x1;

/// "Hypervisor present" bit in ECX of [`CPUID_FEATURE_LEAF`].
pub const CPUID_FEATURE_HYPERVISOR: u32 = 1 << 31;

/// CPUID leaf returning the hypervisor vendor signature in EBX:ECX:EDX.
pub const CPUID_HYPERVISOR_VENDOR_LEAF: u32 = 0x4000_0000;

/// Vendor signature reported by VMware hypervisors.
pub const VMWARE_VENDOR_ID: &str = "VMwareVMware";

// =============================================================================
// Privilege
// =============================================================================

/// I/O privilege level required to issue backdoor port I/O from user mode.
pub const BACKDOOR_IOPL: u8 = 3;

// =============================================================================
// RPCI Wire Format
// =============================================================================

/// Status marker prefixed to a successful RPCI reply.
pub const RPCI_OK: &[u8] = b"1 ";

/// Status marker prefixed to a failed RPCI reply.
pub const RPCI_ERR: &[u8] = b"0 ";

/// Length of the status marker.
pub const RPCI_STATUS_LEN: usize = 2;

/// Command verb for reading a property.
pub const CMD_INFO_GET: &str = "info-get";

/// Command verb for writing a property.
pub const CMD_INFO_SET: &str = "info-set";

/// Command verb for publishing guest info.
///
/// The legacy framing puts two spaces between the verb and the kind.
pub const CMD_SET_GUEST_INFO: &str = "SetGuestInfo";
