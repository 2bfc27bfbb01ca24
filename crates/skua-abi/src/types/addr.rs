// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Virtual address types.
//!
//! [`Vaddr`] is an ordinary virtual address, valid in whichever domain a
//! given call names. [`ScratchAddr`] is an address inside the caller's
//! scratch staging window and is deliberately *not* a [`Vaddr`]: the only
//! way to turn one into a child-visible address is the single checked
//! conversion [`ScratchAddr::to_child_stack`].

use crate::layout::{PAGE_SIZE, SCRATCH_BASE, stack_page_base};
use core::fmt;
use core::ops::{Add, Sub};

/// A virtual memory address.
///
/// Which address space it refers to depends on the call site: mapping
/// primitives name the domain explicitly, everything else means the
/// calling domain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Vaddr(u64);

impl Vaddr {
    /// Create a new virtual address.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Create a null (zero) virtual address.
    ///
    /// Note that zero is a legitimate mapping target; "no page" is expressed
    /// by the [`crate::layout::NO_PAGE`] sentinel, never by null.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self(0)
    }

    /// Get the raw address value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Round this address down to the containing page boundary.
    #[inline]
    #[must_use]
    pub const fn page_align_down(self) -> Self {
        Self(self.0 & !(PAGE_SIZE - 1))
    }

    /// Round this address up to the next page boundary.
    #[inline]
    #[must_use]
    pub const fn page_align_up(self) -> Self {
        Self((self.0.wrapping_add(PAGE_SIZE - 1)) & !(PAGE_SIZE - 1))
    }

    /// Offset of this address within its page.
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.0 & (PAGE_SIZE - 1)
    }

    /// Check if this address sits on a page boundary.
    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.page_offset() == 0
    }
}

impl fmt::Debug for Vaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vaddr({:#x})", self.0)
    }
}

impl fmt::Display for Vaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for Vaddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

impl Add<u64> for Vaddr {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Vaddr {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0.wrapping_sub(rhs))
    }
}

/// An address inside the caller's scratch staging window.
///
/// The scratch window is where a page's contents are assembled before the
/// mapping is moved into a child domain. Addresses in it are meaningless to
/// the child; storing one in child-visible state is always a bug. The type
/// system enforces this: a `ScratchAddr` is constructed from a page offset,
/// can be viewed as a caller-local [`Vaddr`] for staging writes, and crosses
/// into the child's world only through [`ScratchAddr::to_child_stack`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ScratchAddr(u64);

impl ScratchAddr {
    /// Create a staging address at the given offset into the scratch page.
    ///
    /// Returns `None` if the offset does not fall within the page.
    #[inline]
    #[must_use]
    pub const fn at_offset(offset: u64) -> Option<Self> {
        if offset < PAGE_SIZE {
            Some(Self(offset))
        } else {
            None
        }
    }

    /// Offset of this address into the scratch page.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.0
    }

    /// The caller-local address of this staging location.
    ///
    /// Valid only while the scratch window is mapped, and only in the
    /// caller's own address space.
    #[inline]
    #[must_use]
    pub const fn as_local(self) -> Vaddr {
        Vaddr::new(SCRATCH_BASE + self.0)
    }

    /// The address this staging location will have in the child, once the
    /// scratch page is grafted onto the child's initial stack page.
    ///
    /// This is the one sanctioned conversion between the staging world and
    /// the child's world.
    #[inline]
    #[must_use]
    pub const fn to_child_stack(self) -> Vaddr {
        Vaddr::new(stack_page_base().as_u64() + self.0)
    }
}

impl fmt::Debug for ScratchAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScratchAddr(+{:#x})", self.0)
    }
}

impl fmt::Display for ScratchAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scratch+{:#x}", self.0)
    }
}
