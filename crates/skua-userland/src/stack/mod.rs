// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Initial stack page construction.
//!
//! A new domain starts with a single stack page directly below
//! [`skua_abi::STACK_TOP`], pre-populated with its arguments:
//!
//! ```text
//! STACK_TOP ->  +----------------------------+
//!               | argument strings, packed,  |  (top of page)
//!               | each NUL-terminated        |
//!               +----------------------------+
//!               | argv[argc] = 0             |
//!               | argv[..]   = string addrs  |  (8-byte aligned)
//!               +----------------------------+
//!               | pointer to argv[0]         |
//!        sp ->  | argc                       |
//!               +----------------------------+
//!               | free stack space           |
//! ```
//!
//! The page is assembled in the caller's scratch window; all pointers
//! written into it are child-valid addresses obtained through
//! [`ScratchAddr::to_child_stack`], never staging addresses. The whole
//! layout is computed up front, so arguments that cannot fit fail before
//! any page is allocated.

#[cfg(test)]
mod stack_test;

use crate::platform::Kernel;
use crate::scratch::ScratchPage;
use core::fmt;
use skua_abi::layout::stack_page_base;
use skua_abi::{DomainId, PAGE_SIZE, PagePerms, ScratchAddr, SysError, Vaddr};

/// Stack word size in bytes.
const WORD: u64 = 8;

/// Why the initial stack could not be built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackError {
    /// The arguments do not fit in a single page.
    OutOfSpace,
    /// A kernel primitive failed underneath.
    Sys(SysError),
}

impl StackError {
    /// Flatten to the error code the kernel boundary would carry.
    #[must_use]
    pub const fn sys_error(&self) -> SysError {
        match self {
            Self::OutOfSpace => SysError::OutOfSpace,
            Self::Sys(err) => *err,
        }
    }
}

impl From<SysError> for StackError {
    fn from(err: SysError) -> Self {
        Self::Sys(err)
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfSpace => write!(f, "arguments do not fit in one stack page"),
            Self::Sys(err) => write!(f, "{err}"),
        }
    }
}

/// The computed positions of the argument data within the stack page.
///
/// All fields are offsets into the page. Purely arithmetic; computing a
/// layout touches no kernel state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackLayout {
    /// Number of arguments.
    pub argc: usize,
    /// Where the packed argument strings begin.
    pub strings_offset: u64,
    /// Where the pointer array (argc + 1 words) begins.
    pub argv_offset: u64,
    /// Where the argc word sits; this is the initial stack pointer.
    pub sp_offset: u64,
}

impl StackLayout {
    /// Compute the layout for a set of arguments.
    ///
    /// Fails with [`StackError::OutOfSpace`] if strings, pointer array and
    /// the two bottom words cannot all fit in one page.
    pub fn compute(argv: &[&str]) -> Result<Self, StackError> {
        let mut string_bytes: u64 = 0;
        for arg in argv {
            string_bytes = string_bytes
                .checked_add(arg.len() as u64 + 1)
                .ok_or(StackError::OutOfSpace)?;
        }
        if string_bytes > PAGE_SIZE {
            return Err(StackError::OutOfSpace);
        }
        let strings_offset = PAGE_SIZE - string_bytes;
        let aligned = strings_offset & !(WORD - 1);
        let table_bytes = (argv.len() as u64 + 1) * WORD;
        if aligned < table_bytes + 2 * WORD {
            return Err(StackError::OutOfSpace);
        }
        let argv_offset = aligned - table_bytes;
        Ok(Self {
            argc: argv.len(),
            strings_offset,
            argv_offset,
            sp_offset: argv_offset - 2 * WORD,
        })
    }
}

/// Build the initial stack page of `child` from `argv`.
///
/// Stages the page in the scratch window, grafts it below the stack top,
/// and returns the child's initial stack pointer, which addresses the argc
/// word. The word above it holds the child-valid address of the pointer
/// array.
pub fn push_args<K: Kernel>(
    kernel: &K,
    child: DomainId,
    argv: &[&str],
) -> Result<Vaddr, StackError> {
    let layout = StackLayout::compute(argv)?;
    let page = ScratchPage::acquire(kernel).map_err(StackError::Sys)?;

    let mut cursor = layout.strings_offset;
    for (index, arg) in argv.iter().enumerate() {
        let string_at = staging(cursor)?;
        let entry_at = staging(layout.argv_offset + index as u64 * WORD)?;
        page.write_u64(entry_at, string_at.to_child_stack().as_u64())?;
        page.write(string_at, arg.as_bytes())?;
        page.write(staging(cursor + arg.len() as u64)?, &[0])?;
        cursor += arg.len() as u64 + 1;
    }
    page.write_u64(staging(layout.argv_offset + layout.argc as u64 * WORD)?, 0)?;

    let argv_in_child = staging(layout.argv_offset)?.to_child_stack();
    page.write_u64(staging(layout.sp_offset + WORD)?, argv_in_child.as_u64())?;
    page.write_u64(staging(layout.sp_offset)?, layout.argc as u64)?;

    let sp = staging(layout.sp_offset)?.to_child_stack();
    page.graft(child, stack_page_base(), PagePerms::rw_user())
        .map_err(StackError::Sys)?;
    Ok(sp)
}

fn staging(offset: u64) -> Result<ScratchAddr, StackError> {
    ScratchAddr::at_offset(offset).ok_or(StackError::OutOfSpace)
}
