// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Kernel and file-layer trait definitions.

use skua_abi::layout::file_window_base;
use skua_abi::{
    DomainId, InitialRegisters, PagePerms, RendezvousState, SysError, Vaddr,
};

/// The kernel primitives userland programs against.
///
/// An implementation represents one calling domain: methods that take a
/// [`DomainId`] accept [`DomainId::SELF`] as shorthand for the caller, and
/// the address arguments of [`Kernel::read_bytes`] and
/// [`Kernel::write_bytes`] always refer to the caller's own address space.
///
/// Every fallible primitive reports a [`SysError`]; the kernel boundary
/// itself speaks the negative-integer convention described in
/// [`skua_abi::error`].
pub trait Kernel {
    /// The identifier of the calling domain.
    #[must_use]
    fn current_domain(&self) -> DomainId;

    /// Create a fresh, not-runnable domain with an empty address space.
    ///
    /// Returns the new identifier along with a register record
    /// pre-populated with usable defaults; the caller fills in the entry
    /// point and stack pointer before installing it.
    fn create_domain(&self) -> Result<(DomainId, InitialRegisters), SysError>;

    /// Install the initial register state of a domain.
    fn set_registers(
        &self,
        domain: DomainId,
        registers: &InitialRegisters,
    ) -> Result<(), SysError>;

    /// Mark a domain eligible for scheduling.
    fn set_runnable(&self, domain: DomainId) -> Result<(), SysError>;

    /// Allocate a zeroed page and map it at `addr` in `domain`.
    ///
    /// Replaces any mapping already present at that address.
    fn alloc_page(
        &self,
        domain: DomainId,
        addr: Vaddr,
        perms: PagePerms,
    ) -> Result<(), SysError>;

    /// Map the page behind `src_addr` in `src_domain` at `dst_addr` in
    /// `dst_domain`, sharing the underlying frame.
    ///
    /// Write permission may not be granted on a frame the source mapping
    /// holds read-only.
    fn map_page(
        &self,
        src_domain: DomainId,
        src_addr: Vaddr,
        dst_domain: DomainId,
        dst_addr: Vaddr,
        perms: PagePerms,
    ) -> Result<(), SysError>;

    /// Remove the mapping at `addr` in `domain`, if any.
    fn unmap_page(&self, domain: DomainId, addr: Vaddr) -> Result<(), SysError>;

    /// Attempt a rendezvous send to `to`.
    ///
    /// Does not block: if the target is not currently waiting in
    /// [`Kernel::blocking_recv`], fails with [`SysError::NotReceiving`].
    /// `page` is either a page-aligned address of a mapping to offer or the
    /// [`skua_abi::layout::NO_PAGE`] sentinel; a page transfer only happens
    /// if the receiver asked for one.
    fn try_send(
        &self,
        to: DomainId,
        value: u64,
        page: Vaddr,
        perms: PagePerms,
    ) -> Result<(), SysError>;

    /// Block until another domain sends to the caller.
    ///
    /// `dst` is either the page-aligned address at which the caller is
    /// willing to accept a page, or the [`skua_abi::layout::NO_PAGE`]
    /// sentinel to decline page transfers. The message contents are found
    /// in the caller's rendezvous record afterwards.
    fn blocking_recv(&self, dst: Vaddr) -> Result<(), SysError>;

    /// Read the caller's own rendezvous record.
    #[must_use]
    fn rendezvous_state(&self) -> RendezvousState;

    /// Give up the CPU so other domains can make progress.
    fn yield_now(&self);

    /// Read memory from the caller's own address space.
    fn read_bytes(&self, addr: Vaddr, buf: &mut [u8]) -> Result<(), SysError>;

    /// Write memory in the caller's own address space.
    fn write_bytes(&self, addr: Vaddr, bytes: &[u8]) -> Result<(), SysError>;
}

/// An open file descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct Fd(u32);

impl Fd {
    /// Wrap a raw descriptor slot index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The descriptor's slot index.
    #[inline]
    #[must_use]
    pub const fn as_index(self) -> u64 {
        self.0 as u64
    }

    /// Base address of this descriptor's file mapping stripe.
    #[inline]
    #[must_use]
    pub const fn window_base(self) -> Vaddr {
        file_window_base(self.as_index())
    }
}

/// The file service userland reads executable images through.
///
/// Beyond plain positional reads, the layer can expose whole pages of a
/// file directly in the caller's address space ([`FileLayer::read_map`]);
/// those pages alias the file's backing frames, which is what makes
/// program text shareable between domains.
pub trait FileLayer {
    /// Open the file at `path` for reading.
    fn open(&self, path: &str) -> Result<Fd, SysError>;

    /// Close a descriptor, releasing its slot and its mapping stripe.
    fn close(&self, fd: Fd) -> Result<(), SysError>;

    /// Set the read position of a descriptor.
    fn seek(&self, fd: Fd, offset: u64) -> Result<(), SysError>;

    /// Read from the current position, advancing it.
    ///
    /// Returns the number of bytes read; 0 means end of file.
    fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize, SysError>;

    /// Map one page of the file into the caller's mapping stripe.
    ///
    /// `offset` must be page-aligned and within the file. The returned
    /// address points at a read-only alias of the file's backing page.
    fn read_map(&self, fd: Fd, offset: u64) -> Result<Vaddr, SysError>;
}
