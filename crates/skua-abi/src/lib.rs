// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared ABI definitions between the Skua kernel interface and userland.
//!
//! This crate defines the contract the userland runtime programs against:
//! - Type definitions for domain identifiers and addresses
//! - Page permission encoding used by the mapping primitives
//! - The fixed virtual address layout (stack page, scratch window, sentinels)
//! - The per-domain rendezvous record filled in by a matched send
//! - The negative-integer error code convention of the kernel boundary
//!
//! # Design Principles
//!
//! - **No dependencies**: Pure data types, 100% host-testable
//! - **Stable layout**: Records crossing the boundary use `#[repr(C)]`
//! - **64-bit only**: Skua targets 64-bit platforms exclusively
//!
//! # Modules
//!
//! - [`types`]: Core types (`DomainId`, `Vaddr`, `ScratchAddr`)
//! - [`layout`]: Virtual address layout constants and sentinels
//! - [`perms`]: Page permission bits
//! - [`error`]: Kernel error codes
//! - [`registers`]: Initial register state for new domains
//! - [`rendezvous`]: Per-domain rendezvous record
//! - [`status`]: Domain scheduling status

#![no_std]

pub mod error;
pub mod layout;
pub mod perms;
pub mod registers;
pub mod rendezvous;
pub mod status;
pub mod types;

// Re-export commonly used types at crate root
pub use error::SysError;
pub use layout::{NO_PAGE, PAGE_SIZE, SCRATCH_BASE, STACK_TOP};
pub use perms::PagePerms;
pub use registers::InitialRegisters;
pub use rendezvous::RendezvousState;
pub use status::DomainStatus;
pub use types::{DomainId, ScratchAddr, Vaddr};
