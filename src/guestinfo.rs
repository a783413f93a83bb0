//! Guest-info property identifiers.
//!
//! `SetGuestInfo` addresses properties by a small integer. The well-known
//! values form [`GuestInfoKind`]; [`GuestInfoId`] carries any integer so that
//! values unknown to this crate can still be sent. Display names are for
//! logging only, the wire always carries the integer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name for identifiers outside [`GuestInfoKind`].
pub const UNKNOWN_GUEST_INFO: &str = "UNKNOWN";

/// Well-known guest-info properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum GuestInfoKind {
    /// Error.
    Error = 0,
    /// DNS name of the guest.
    DnsName = 1,
    /// IP address, V1 format.
    IpAddress = 2,
    /// Free disk space.
    DiskFreeSpace = 3,
    /// Tools build number.
    BuildNumber = 4,
    /// Full OS name.
    OsNameFull = 5,
    /// Short OS name.
    OsName = 6,
    /// Uptime in hundredths of a second.
    Uptime = 7,
    /// Amount of memory.
    Memory = 8,
    /// IP address, V2 format.
    IpAddressV2 = 9,
    /// IP address, V3 format.
    IpAddressV3 = 10,
    /// Detailed OS information.
    OsDetailed = 11,
}

impl GuestInfoKind {
    /// Every known kind, in wire order.
    pub const ALL: [Self; 12] = [
        Self::Error,
        Self::DnsName,
        Self::IpAddress,
        Self::DiskFreeSpace,
        Self::BuildNumber,
        Self::OsNameFull,
        Self::OsName,
        Self::Uptime,
        Self::Memory,
        Self::IpAddressV2,
        Self::IpAddressV3,
        Self::OsDetailed,
    ];

    /// Returns the wire identifier.
    #[must_use]
    pub fn id(self) -> GuestInfoId {
        GuestInfoId(self as u32)
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::DnsName => "DNS name",
            Self::IpAddress => "IP address (V1 format)",
            Self::DiskFreeSpace => "Disk free space",
            Self::BuildNumber => "Build number",
            Self::OsNameFull => "Full OS name",
            Self::OsName => "Short OS name",
            Self::Uptime => "Uptime",
            Self::Memory => "Memory",
            Self::IpAddressV2 => "IP address (V2 format)",
            Self::IpAddressV3 => "IP address (V3 format)",
            Self::OsDetailed => "Detailed OS info",
        }
    }
}

impl fmt::Display for GuestInfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl TryFrom<u32> for GuestInfoKind {
    type Error = GuestInfoId;

    fn try_from(value: u32) -> Result<Self, GuestInfoId> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(GuestInfoId(value))
    }
}

/// Raw guest-info identifier as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestInfoId(pub u32);

impl GuestInfoId {
    /// Returns the known kind for this identifier, if any.
    #[must_use]
    pub fn kind(self) -> Option<GuestInfoKind> {
        GuestInfoKind::try_from(self.0).ok()
    }

    /// Returns the human-readable name, or `"UNKNOWN"`.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        self.kind()
            .map_or(UNKNOWN_GUEST_INFO, GuestInfoKind::display_name)
    }
}

impl From<GuestInfoKind> for GuestInfoId {
    fn from(kind: GuestInfoKind) -> Self {
        kind.id()
    }
}

impl fmt::Display for GuestInfoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
