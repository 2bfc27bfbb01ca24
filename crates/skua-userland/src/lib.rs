// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! User-level runtime for Skua domains.
//!
//! This crate implements the two userland services every Skua domain builds
//! on: starting new domains from executable images ([`spawn()`]) and
//! exchanging messages over the kernel's rendezvous primitive ([`ipc`]).
//! Both are written against the [`platform::Kernel`] and
//! [`platform::FileLayer`] traits rather than raw kernel calls, so the whole
//! crate is host-testable against the in-memory platform in
//! [`platform::mock`].
//!
//! # Modules
//!
//! - [`platform`]: The kernel and file-layer seams (plus the mock)
//! - [`image`]: Executable image validation and segment enumeration
//! - [`scratch`]: Scoped ownership of the scratch staging page
//! - [`stack`]: Initial stack page construction
//! - [`spawn`]: The domain loader
//! - [`ipc`]: Rendezvous send and receive
//!
//! # Design Principles
//!
//! - **`no_std` core**: Only the mock platform needs the `std` feature
//! - **No unsafe**: Image parsing and stack building are plain slice code
//! - **Fail explicit**: Every kernel interaction returns a typed error

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod image;
pub mod ipc;
pub mod platform;
pub mod scratch;
pub mod spawn;
pub mod stack;

pub use ipc::{Received, SendFatal, recv, send};
pub use platform::{Fd, FileLayer, Kernel};
pub use spawn::{SpawnError, spawn};

/// Version of the crate, injected by the release tooling.
pub const VERSION: &str = match option_env!("SKUA_VERSION") {
    Some(version) => version,
    None => "dev",
};
