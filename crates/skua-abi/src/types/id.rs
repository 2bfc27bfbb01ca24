// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Domain identifier type.

use core::fmt;

/// Unique identifier for a domain (an isolated execution context with its
/// own address space).
///
/// Domain IDs are assigned by the kernel at creation time and are never
/// reused while the domain is referenced. ID 0 is special: in kernel calls
/// it means "the calling domain" ([`DomainId::SELF`]), and in a cleared
/// rendezvous record it means "no sender" ([`DomainId::NULL`]).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct DomainId(u64);

impl DomainId {
    /// Shorthand for the calling domain in kernel calls.
    pub const SELF: Self = Self(0);

    /// The "no domain" value found in a cleared rendezvous record.
    pub const NULL: Self = Self(0);

    /// The first real domain ID the kernel hands out.
    pub const FIRST: Self = Self(1);

    /// Creates a new domain ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Checks if this is the null/self domain ID.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainId({})", self.0)
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "domain:{}", self.0)
    }
}
