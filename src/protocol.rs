//! RPCI wire format.
//!
//! Requests are plain ASCII commands; replies carry a two-byte status marker
//! followed by the payload.
//!
//! ```text
//! Guest                                    Hypervisor
//!   |  info-get guestinfo.hostname            |
//!   |---------------------------------------->|
//!   |  1 web-01                               |
//!   |<----------------------------------------|
//!   |  info-get guestinfo.missing             |
//!   |---------------------------------------->|
//!   |  0 No value found                       |
//!   |<----------------------------------------|
//! ```
//!
//! | Command                              | Reply payload          |
//! |--------------------------------------|------------------------|
//! | `info-get <key>`                     | value or error text    |
//! | `info-set <key> <value>`             | empty or error text    |
//! | `SetGuestInfo  <kind-int> <data>`    | empty or error text    |

use crate::constants::{
    CMD_INFO_GET, CMD_INFO_SET, CMD_SET_GUEST_INFO, RPCI_ERR, RPCI_OK, RPCI_STATUS_LEN,
};
use crate::guestinfo::GuestInfoId;

// =============================================================================
// Commands
// =============================================================================

/// Command sent over an RPCI channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Read a property.
    InfoGet { key: &'a str },
    /// Write a property.
    InfoSet { key: &'a str, value: &'a str },
    /// Publish guest info.
    SetGuestInfo { kind: GuestInfoId, data: &'a [u8] },
}

impl Command<'_> {
    /// Returns the command verb.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::InfoGet { .. } => CMD_INFO_GET,
            Self::InfoSet { .. } => CMD_INFO_SET,
            Self::SetGuestInfo { .. } => CMD_SET_GUEST_INFO,
        }
    }

    /// Encodes the command to its wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::InfoGet { key } => format!("{CMD_INFO_GET} {key}").into_bytes(),
            Self::InfoSet { key, value } => format!("{CMD_INFO_SET} {key} {value}").into_bytes(),
            Self::SetGuestInfo { kind, data } => {
                // Two spaces before the kind: legacy framing the host parses.
                let mut msg = format!("{CMD_SET_GUEST_INFO}  {} ", kind.0).into_bytes();
                msg.extend_from_slice(data);
                msg
            }
        }
    }
}

// =============================================================================
// Replies
// =============================================================================

/// Classified RPCI reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Whether the hypervisor reported success.
    pub ok: bool,
    /// Bytes following the status marker.
    pub payload: Vec<u8>,
}

impl Reply {
    /// Splits a raw reply into status and payload.
    ///
    /// Returns `None` when the reply does not start with `"1 "` or `"0 "`.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let ok = if raw.starts_with(RPCI_OK) {
            true
        } else if raw.starts_with(RPCI_ERR) {
            false
        } else {
            return None;
        };

        Some(Self {
            ok,
            payload: raw[RPCI_STATUS_LEN..].to_vec(),
        })
    }

    /// Returns the payload decoded as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
