// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Page permission encoding for the mapping primitives.

use core::fmt;

/// Permission bit: mapping is present.
const PERM_PRESENT: u64 = 1 << 0;

/// Permission bit: mapping is writable.
const PERM_WRITE: u64 = 1 << 1;

/// Permission bit: mapping is user-accessible.
const PERM_USER: u64 = 1 << 2;

/// All bits a permission mask may carry.
const PERM_MASK: u64 = PERM_PRESENT | PERM_WRITE | PERM_USER;

/// Page permissions for a single mapping.
///
/// Every mapping call carries one of these; the kernel encodes them as a
/// plain bitmask ([`PagePerms::to_bits`]). A permission value of all-false
/// (bits 0) is how "no page arrived" is reported in a rendezvous record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PagePerms {
    /// Mapping is present.
    pub present: bool,
    /// Mapping is writable.
    pub write: bool,
    /// Mapping is user-accessible.
    pub user: bool,
}

impl PagePerms {
    /// No permissions at all (also: "no page was transferred").
    #[inline]
    #[must_use]
    pub const fn none() -> Self {
        Self {
            present: false,
            write: false,
            user: false,
        }
    }

    /// Present, read-only, user-accessible.
    #[inline]
    #[must_use]
    pub const fn ro_user() -> Self {
        Self {
            present: true,
            write: false,
            user: true,
        }
    }

    /// Present, writable, user-accessible.
    #[inline]
    #[must_use]
    pub const fn rw_user() -> Self {
        Self {
            present: true,
            write: true,
            user: true,
        }
    }

    /// Decode from the kernel's bitmask encoding. Unknown bits are ignored.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            present: bits & PERM_PRESENT != 0,
            write: bits & PERM_WRITE != 0,
            user: bits & PERM_USER != 0,
        }
    }

    /// Encode into the kernel's bitmask encoding.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        let mut bits = 0;
        if self.present {
            bits |= PERM_PRESENT;
        }
        if self.write {
            bits |= PERM_WRITE;
        }
        if self.user {
            bits |= PERM_USER;
        }
        bits
    }

    /// Check whether a raw bitmask carries only known bits.
    #[inline]
    #[must_use]
    pub const fn bits_are_valid(bits: u64) -> bool {
        bits & !PERM_MASK == 0
    }

    /// Returns true if any bit is set.
    #[inline]
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.present || self.write || self.user
    }

    /// Returns a short string representation (e.g., "RW", "RO").
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match (self.present, self.write) {
            (false, _) => "--",
            (true, false) => "RO",
            (true, true) => "RW",
        }
    }
}

impl fmt::Display for PagePerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
