// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The seams between this crate and the system it runs on.
//!
//! Everything the loader and the IPC helpers need from the outside world is
//! expressed through two traits: [`Kernel`] for the kernel primitives and
//! [`FileLayer`] for the file service. Production code passes the real
//! bindings; tests pass handles into the in-memory [`mock`] platform.

pub mod traits;

#[cfg(any(test, feature = "std"))]
pub mod mock;


pub use traits::{Fd, FileLayer, Kernel};
