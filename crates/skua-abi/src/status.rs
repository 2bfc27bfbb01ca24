// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Domain scheduling status.

use core::fmt;

/// Scheduling status of a domain.
///
/// A freshly created domain is [`DomainStatus::NotRunnable`] until the
/// loader finishes constructing it; a failed load leaves it that way
/// forever (it is never started, merely orphaned).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DomainStatus {
    /// Created but not yet eligible to run (or blocked in a receive).
    #[default]
    NotRunnable,
    /// Eligible for scheduling.
    Runnable,
    /// Finished; identifier kept until released.
    Terminated,
}

impl DomainStatus {
    /// Returns true if the scheduler may pick this domain.
    #[inline]
    #[must_use]
    pub const fn is_runnable(self) -> bool {
        matches!(self, Self::Runnable)
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunnable => write!(f, "not-runnable"),
            Self::Runnable => write!(f, "runnable"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}
