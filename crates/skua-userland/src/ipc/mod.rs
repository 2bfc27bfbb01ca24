// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Rendezvous send and receive.
//!
//! The kernel's message passing is a pure rendezvous: a send only succeeds
//! while the target is blocked in a receive, and each message carries one
//! word plus, optionally, one page mapping. [`send`] wraps the retry loop
//! around the kernel's non-blocking attempt; [`recv`] wraps the blocking
//! wait and reads the delivered message out of the caller's rendezvous
//! record.

#[cfg(test)]
mod ipc_test;

use crate::platform::Kernel;
use core::fmt;
use skua_abi::layout::NO_PAGE;
use skua_abi::{DomainId, PagePerms, SysError, Vaddr};

/// A message delivered by [`recv`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Received {
    /// The value the sender passed.
    pub value: u64,
    /// Who sent it.
    pub sender: DomainId,
    /// Permissions of the transferred page; all-false if no page arrived.
    pub page_perms: PagePerms,
}

/// A send failed in a way that retrying cannot fix.
///
/// The retry loop in [`send`] absorbs every transient condition, so a
/// `SendFatal` means the conversation itself is broken (the target is gone
/// or the arguments are unusable). Callers are expected to treat this as
/// the end of their exchange with `to`, not as something to handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendFatal {
    /// The domain the message was addressed to.
    pub to: DomainId,
    /// What the kernel reported.
    pub cause: SysError,
}

impl fmt::Display for SendFatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecoverable send to {}: {}", self.to, self.cause)
    }
}

/// Block until a message arrives.
///
/// `page_at` is the page-aligned address at which the caller accepts a
/// page transfer, or `None` to decline pages; a sender's page offer is
/// silently dropped in that case. Returns the delivered word, the sender
/// and the permissions of the page that arrived, if any.
pub fn recv<K: Kernel>(kernel: &K, page_at: Option<Vaddr>) -> Result<Received, SysError> {
    kernel.blocking_recv(page_at.unwrap_or(NO_PAGE))?;
    let state = kernel.rendezvous_state();
    Ok(Received {
        value: state.value,
        sender: state.sender,
        page_perms: state.perms(),
    })
}

/// Send a message, waiting for the target to receive.
///
/// Retries for as long as the target merely is not receiving yet, yielding
/// the CPU between attempts, with the identical value and page offer each
/// time. Any other failure is returned as [`SendFatal`].
pub fn send<K: Kernel>(
    kernel: &K,
    to: DomainId,
    value: u64,
    page: Option<(Vaddr, PagePerms)>,
) -> Result<(), SendFatal> {
    let (page_addr, perms) = page.unwrap_or((NO_PAGE, PagePerms::none()));
    loop {
        match kernel.try_send(to, value, page_addr, perms) {
            Ok(()) => return Ok(()),
            Err(err) if err.is_retryable() => kernel.yield_now(),
            Err(cause) => return Err(SendFatal { to, cause }),
        }
    }
}
