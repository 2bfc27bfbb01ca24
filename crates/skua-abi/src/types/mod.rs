// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Core type definitions for domain identifiers and addresses.
//!
//! These newtypes prevent accidentally mixing different kinds of values at
//! compile time. In particular, staging addresses inside the scratch window
//! are a distinct type from ordinary virtual addresses, so a caller-local
//! staging pointer can never leak into child-visible state unconverted.

mod addr;
mod id;


pub use addr::{ScratchAddr, Vaddr};
pub use id::DomainId;
