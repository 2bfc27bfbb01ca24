// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Per-domain rendezvous record.

use crate::perms::PagePerms;
use crate::types::DomainId;

/// The rendezvous fields of a domain.
///
/// The blocking receive call does not return the message contents directly;
/// the kernel writes them into the receiving domain's own record on a
/// matched send, and the receiver reads them back after waking up. At most
/// one message may be outstanding per receiving domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct RendezvousState {
    /// The scalar value the sender passed.
    pub value: u64,
    /// Who sent the pending message ([`DomainId::NULL`] when cleared).
    pub sender: DomainId,
    /// Permission bits of the transferred page; 0 if no page arrived.
    pub perm_bits: u64,
}

impl RendezvousState {
    /// A cleared record: no sender, no value, no page.
    #[inline]
    #[must_use]
    pub const fn cleared() -> Self {
        Self {
            value: 0,
            sender: DomainId::NULL,
            perm_bits: 0,
        }
    }

    /// Decode the transferred page permissions.
    ///
    /// All-false iff no page accompanied the message.
    #[inline]
    #[must_use]
    pub const fn perms(&self) -> PagePerms {
        PagePerms::from_bits(self.perm_bits)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn cleared_record_has_no_sender_and_no_page() {
        let state = RendezvousState::cleared();
        assert!(state.sender.is_null());
        assert_eq!(state.value, 0);
        assert!(!state.perms().is_some());
    }
}
