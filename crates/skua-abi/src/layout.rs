// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Virtual address layout constants and sentinels.
//!
//! This module defines the fixed virtual address layout every domain shares.
//! Using fixed addresses keeps the loader simple and makes the initial stack
//! page relocatable between the caller's staging window and the child.
//!
//! # Address Space Layout (64-bit, user half)
//!
//! ```text
//! 0x0000_0000_0000_0000  NULL guard (unmapped, 4 KB)
//! 0x0000_0000_0040_0000  Scratch staging window (one page)
//! 0x0000_0000_0080_0000  Program text and data (per image)
//! 0x0000_6000_0000_0000  File mapping windows (one stripe per open file)
//! 0x0000_7000_0000_0000  Initial stack top (stack page directly below)
//! 0x0000_7F00_0000_0000  End of mappable space; doubles as NO_PAGE sentinel
//! ```

use crate::types::Vaddr;

/// One gigabyte in bytes.
const GB: u64 = 1024 * 1024 * 1024;

/// One kilobyte in bytes.
const KB: u64 = 1024;

/// Standard page size (4 KB).
pub const PAGE_SIZE: u64 = 4 * KB;

/// Page size shift (log2 of `PAGE_SIZE`).
pub const PAGE_SHIFT: u32 = 12;

// =============================================================================
// Region Base Addresses
// =============================================================================

/// Base address of the scratch staging window.
///
/// A single process-wide page slot where the caller assembles a page's
/// contents before moving the mapping into a child domain. Exactly one
/// staged page may be outstanding at a time.
pub const SCRATCH_BASE: u64 = 0x0000_0000_0040_0000;

/// Lowest address program images may be linked at.
pub const TEXT_BASE: u64 = 0x0000_0000_0080_0000;

/// Base address of the file mapping windows.
///
/// The file layer exposes read-mapped pages of open files here, one stripe
/// per file descriptor. Pages in a stripe alias the file's backing pages
/// directly, enabling page-level sharing of program text across domains.
pub const FILE_WINDOW_BASE: u64 = 0x0000_6000_0000_0000;

/// Size of one file mapping stripe (4 GB - one open file's address budget).
pub const FILE_WINDOW_STRIDE: u64 = 4 * GB;

/// Maximum number of simultaneously open files.
pub const MAX_OPEN_FILES: u64 = 32;

/// Top of the initial stack; the stack page sits directly below.
pub const STACK_TOP: u64 = 0x0000_7000_0000_0000;

/// First address above all legal user mappings.
pub const USER_TOP: u64 = 0x0000_7F00_0000_0000;

/// Sentinel meaning "no page" in send/receive calls.
///
/// Zero cannot serve as the sentinel because zero is a legitimate mapping
/// target; the first address above mappable space is used instead.
pub const NO_PAGE: Vaddr = Vaddr::new(USER_TOP);

// =============================================================================
// Helper Functions
// =============================================================================

/// Base address of the child's initial stack page.
#[inline]
#[must_use]
pub const fn stack_page_base() -> Vaddr {
    Vaddr::new(STACK_TOP - PAGE_SIZE)
}

/// Base address of the file mapping stripe for a file descriptor index.
#[inline]
#[must_use]
pub const fn file_window_base(fd_index: u64) -> Vaddr {
    Vaddr::new(FILE_WINDOW_BASE + fd_index * FILE_WINDOW_STRIDE)
}

/// Round a byte count down to a whole number of pages.
#[inline]
#[must_use]
pub const fn page_round_down(value: u64) -> u64 {
    value & !(PAGE_SIZE - 1)
}

/// Round a byte count up to a whole number of pages.
#[inline]
#[must_use]
pub const fn page_round_up(value: u64) -> u64 {
    (value.wrapping_add(PAGE_SIZE - 1)) & !(PAGE_SIZE - 1)
}

// Compile-time verification that regions do not overlap
const _: () = {
    assert!(SCRATCH_BASE + PAGE_SIZE <= TEXT_BASE);
    assert!(TEXT_BASE < FILE_WINDOW_BASE);
    assert!(FILE_WINDOW_BASE + MAX_OPEN_FILES * FILE_WINDOW_STRIDE <= STACK_TOP - PAGE_SIZE);
    assert!(STACK_TOP <= USER_TOP);
    assert!(PAGE_SIZE.is_power_of_two());
};
