// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Initial register state for starting a domain.

use crate::types::Vaddr;

/// Initial CPU register state installed into a domain before it first runs.
///
/// Domain creation returns a record pre-populated with usable defaults
/// (a valid page table root and nothing domain-specific); the loader fills
/// in the entry point and the initial stack pointer before installing it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct InitialRegisters {
    /// Program counter - entry point address.
    pub pc: Vaddr,
    /// Stack pointer - points at the argc word on the initial stack.
    pub sp: Vaddr,
}

impl InitialRegisters {
    /// Create a register record with both pointers set.
    #[inline]
    #[must_use]
    pub const fn new(pc: Vaddr, sp: Vaddr) -> Self {
        Self { pc, sp }
    }
}
