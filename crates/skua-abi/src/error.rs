// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Kernel error codes.
//!
//! The kernel boundary speaks a negative-integer convention: non-negative
//! results are success values, negative results are error codes. This module
//! gives those codes a typed surface on the Rust side.

use core::fmt;

/// An error reported by a kernel or file-layer primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i64)]
pub enum SysError {
    /// The named domain does not exist or the caller has no rights over it.
    BadDomain = 1,
    /// An argument was malformed (bad address, bad permission bits, ...).
    Invalid = 2,
    /// No physical page could be allocated.
    NoMemory = 3,
    /// No free domain slot is available.
    NoFreeDomain = 4,
    /// The target domain is not currently waiting to receive.
    ///
    /// This is the only retryable condition a send attempt can report.
    NotReceiving = 5,
    /// No file exists at the given path.
    NotFound = 6,
    /// The file layer failed to read or seek.
    Io = 7,
    /// A single-page construction would not fit in one page.
    OutOfSpace = 8,
    /// An executable image failed validation.
    InvalidFormat = 9,
    /// No mapping exists at the given address.
    Unmapped = 10,
    /// The file layer has no free descriptor slot.
    OutOfDescriptors = 11,
}

impl SysError {
    /// The negative code this error travels as across the kernel boundary.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i64 {
        -(self as i64)
    }

    /// Decode a negative result code. Returns `None` for non-negative values
    /// and for codes this ABI does not define.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::BadDomain),
            -2 => Some(Self::Invalid),
            -3 => Some(Self::NoMemory),
            -4 => Some(Self::NoFreeDomain),
            -5 => Some(Self::NotReceiving),
            -6 => Some(Self::NotFound),
            -7 => Some(Self::Io),
            -8 => Some(Self::OutOfSpace),
            -9 => Some(Self::InvalidFormat),
            -10 => Some(Self::Unmapped),
            -11 => Some(Self::OutOfDescriptors),
            _ => None,
        }
    }

    /// Returns true if a send attempt may simply be retried on this error.
    #[inline]
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::NotReceiving)
    }
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDomain => write!(f, "bad domain or insufficient rights"),
            Self::Invalid => write!(f, "invalid argument"),
            Self::NoMemory => write!(f, "out of physical memory"),
            Self::NoFreeDomain => write!(f, "no free domain slot"),
            Self::NotReceiving => write!(f, "target is not receiving"),
            Self::NotFound => write!(f, "no such file"),
            Self::Io => write!(f, "file I/O error"),
            Self::OutOfSpace => write!(f, "does not fit in one page"),
            Self::InvalidFormat => write!(f, "invalid executable image"),
            Self::Unmapped => write!(f, "no mapping at address"),
            Self::OutOfDescriptors => write!(f, "no free file descriptor"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn codes_are_negative_and_roundtrip() {
        let all = [
            SysError::BadDomain,
            SysError::Invalid,
            SysError::NoMemory,
            SysError::NoFreeDomain,
            SysError::NotReceiving,
            SysError::NotFound,
            SysError::Io,
            SysError::OutOfSpace,
            SysError::InvalidFormat,
            SysError::Unmapped,
            SysError::OutOfDescriptors,
        ];
        for err in all {
            assert!(err.code() < 0);
            assert_eq!(SysError::from_code(err.code()), Some(err));
        }
    }

    #[test]
    fn non_errors_do_not_decode() {
        assert_eq!(SysError::from_code(0), None);
        assert_eq!(SysError::from_code(17), None);
        assert_eq!(SysError::from_code(-9999), None);
    }

    #[test]
    fn only_not_receiving_is_retryable() {
        assert!(SysError::NotReceiving.is_retryable());
        assert!(!SysError::BadDomain.is_retryable());
        assert!(!SysError::NoMemory.is_retryable());
    }
}
