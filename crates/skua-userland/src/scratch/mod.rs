// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Scoped ownership of the scratch staging page.
//!
//! The scratch window at [`SCRATCH_BASE`] is a single process-wide page
//! slot, so at most one staged page may exist at a time. [`ScratchPage`]
//! makes that rule structural: acquiring the guard allocates and maps the
//! page, and every exit path releases the staging mapping again, whether
//! through [`ScratchPage::graft`] or through drop.


use crate::platform::Kernel;
use skua_abi::{DomainId, PAGE_SIZE, PagePerms, SCRATCH_BASE, ScratchAddr, SysError, Vaddr};

/// A freshly allocated, zeroed page mapped at the scratch window.
///
/// Content is assembled through [`ScratchPage::write`] at typed
/// [`ScratchAddr`] positions, then the whole page is moved into a child
/// domain with [`ScratchPage::graft`]. If the guard is dropped instead,
/// the staging mapping is removed and the page is gone.
pub struct ScratchPage<'k, K: Kernel> {
    kernel: &'k K,
    armed: bool,
}

impl<'k, K: Kernel> ScratchPage<'k, K> {
    /// Allocate a zeroed page and map it at the scratch window.
    pub fn acquire(kernel: &'k K) -> Result<Self, SysError> {
        kernel.alloc_page(
            DomainId::SELF,
            Vaddr::new(SCRATCH_BASE),
            PagePerms::rw_user(),
        )?;
        Ok(Self {
            kernel,
            armed: true,
        })
    }

    /// Write bytes at a staging position.
    ///
    /// Fails with [`SysError::Invalid`] if the write would run past the
    /// end of the page.
    pub fn write(&self, at: ScratchAddr, bytes: &[u8]) -> Result<(), SysError> {
        let end = at
            .offset()
            .checked_add(bytes.len() as u64)
            .ok_or(SysError::Invalid)?;
        if end > PAGE_SIZE {
            return Err(SysError::Invalid);
        }
        self.kernel.write_bytes(at.as_local(), bytes)
    }

    /// Write a little-endian word at a staging position.
    pub fn write_u64(&self, at: ScratchAddr, value: u64) -> Result<(), SysError> {
        self.write(at, &value.to_le_bytes())
    }

    /// Move the page into `child` at `dst` and release the staging mapping.
    ///
    /// On failure the staging mapping is released as well; the page never
    /// stays behind in the window.
    pub fn graft(mut self, child: DomainId, dst: Vaddr, perms: PagePerms) -> Result<(), SysError> {
        self.kernel
            .map_page(DomainId::SELF, Vaddr::new(SCRATCH_BASE), child, dst, perms)?;
        self.release()
    }

    fn release(&mut self) -> Result<(), SysError> {
        self.armed = false;
        self.kernel
            .unmap_page(DomainId::SELF, Vaddr::new(SCRATCH_BASE))
    }
}

impl<K: Kernel> Drop for ScratchPage<'_, K> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self
                .kernel
                .unmap_page(DomainId::SELF, Vaddr::new(SCRATCH_BASE));
        }
    }
}
