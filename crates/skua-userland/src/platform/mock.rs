// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! In-memory platform for host-side development.
//!
//! [`MockOs`] models just enough of the system to exercise the loader and
//! the rendezvous protocol: per-domain mapping tables over refcounted page
//! frames, a blocking receive built on a condition variable so real sender
//! and receiver threads can meet, and an installable file store whose
//! backing frames are shared through [`FileLayer::read_map`] exactly like
//! the real file service shares program text.
//!
//! Handles are cheap clones over shared state; one [`MockOs`] can hand out
//! a handle per domain and the handles can live on different threads.

use crate::platform::{Fd, FileLayer, Kernel};
use skua_abi::layout::{FILE_WINDOW_STRIDE, MAX_OPEN_FILES, NO_PAGE, PAGE_SIZE, USER_TOP};
use skua_abi::{
    DomainId, DomainStatus, InitialRegisters, PagePerms, RendezvousState, SysError, Vaddr,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

const PAGE: usize = PAGE_SIZE as usize;

/// One physical page frame with its mapping refcount.
///
/// File store anchors count as a reference, so file-backed frames outlive
/// every transient mapping of them.
struct Frame {
    data: Box<[u8; PAGE]>,
    refs: usize,
}

impl Frame {
    fn zeroed() -> Self {
        Self {
            data: Box::new([0u8; PAGE]),
            refs: 1,
        }
    }
}

/// One entry in a domain's mapping table.
#[derive(Clone, Copy)]
struct Mapping {
    frame: usize,
    perms: PagePerms,
}

struct Domain {
    status: DomainStatus,
    registers: InitialRegisters,
    mappings: BTreeMap<u64, Mapping>,
    rendezvous: RendezvousState,
    /// Where this domain is willing to accept a page while blocked in a
    /// receive; `None` means it is not receiving at all.
    recv_at: Option<Vaddr>,
    delivered: bool,
}

impl Domain {
    fn new() -> Self {
        Self {
            status: DomainStatus::NotRunnable,
            registers: InitialRegisters::default(),
            mappings: BTreeMap::new(),
            rendezvous: RendezvousState::cleared(),
            recv_at: None,
            delivered: false,
        }
    }
}

struct StoredFile {
    frames: Vec<usize>,
    len: u64,
}

struct OpenFile {
    path: String,
    pos: u64,
}

struct Inner {
    next_domain: u64,
    domains: BTreeMap<u64, Domain>,
    frames: Vec<Option<Frame>>,
    files: BTreeMap<String, StoredFile>,
    open_files: Vec<Option<OpenFile>>,
}

impl Inner {
    fn alloc_frame(&mut self) -> usize {
        for (index, slot) in self.frames.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(Frame::zeroed());
                return index;
            }
        }
        self.frames.push(Some(Frame::zeroed()));
        self.frames.len() - 1
    }

    fn retain_frame(&mut self, index: usize) {
        if let Some(frame) = self.frames[index].as_mut() {
            frame.refs += 1;
        }
    }

    fn release_frame(&mut self, index: usize) {
        if let Some(frame) = self.frames[index].as_mut() {
            frame.refs -= 1;
            if frame.refs == 0 {
                self.frames[index] = None;
            }
        }
    }

    fn resolve(&self, caller: DomainId, named: DomainId) -> u64 {
        if named.is_null() {
            caller.as_u64()
        } else {
            named.as_u64()
        }
    }

    fn domain_mut(&mut self, id: u64) -> Result<&mut Domain, SysError> {
        self.domains.get_mut(&id).ok_or(SysError::BadDomain)
    }

    /// Install a mapping whose frame reference the caller already holds.
    /// The domain must be known to exist.
    fn install_mapping(&mut self, id: u64, addr: Vaddr, mapping: Mapping) {
        if let Some(domain) = self.domains.get_mut(&id) {
            if let Some(old) = domain.mappings.insert(addr.as_u64(), mapping) {
                self.release_frame(old.frame);
            }
        }
    }

    fn open_entry(&mut self, fd: Fd) -> Result<&mut OpenFile, SysError> {
        self.open_files
            .get_mut(fd.as_index() as usize)
            .and_then(Option::as_mut)
            .ok_or(SysError::Invalid)
    }
}

fn check_page_addr(addr: Vaddr) -> Result<(), SysError> {
    if addr.is_page_aligned() && addr.as_u64() < USER_TOP {
        Ok(())
    } else {
        Err(SysError::Invalid)
    }
}

fn check_map_perms(perms: PagePerms) -> Result<(), SysError> {
    if perms.present && perms.user {
        Ok(())
    } else {
        Err(SysError::Invalid)
    }
}

struct Shared {
    inner: Mutex<Inner>,
    wakeups: Condvar,
}

/// The in-memory system. See the module documentation.
pub struct MockOs {
    shared: Arc<Shared>,
}

impl MockOs {
    /// Create a system with a single runnable root domain,
    /// [`DomainId::FIRST`].
    #[must_use]
    pub fn new() -> Self {
        let mut domains = BTreeMap::new();
        let mut root = Domain::new();
        root.status = DomainStatus::Runnable;
        domains.insert(DomainId::FIRST.as_u64(), root);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    next_domain: DomainId::FIRST.as_u64() + 1,
                    domains,
                    frames: Vec::new(),
                    files: BTreeMap::new(),
                    open_files: (0..MAX_OPEN_FILES).map(|_| None).collect(),
                }),
                wakeups: Condvar::new(),
            }),
        }
    }

    /// Handle acting as the root domain.
    #[must_use]
    pub fn root(&self) -> MockHandle {
        self.handle(DomainId::FIRST)
    }

    /// Handle acting as the given domain.
    #[must_use]
    pub fn handle(&self, domain: DomainId) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
            domain,
        }
    }

    /// Put a file into the store, replacing any previous content.
    pub fn install_file(&self, path: &str, bytes: &[u8]) {
        let mut inner = self.lock();
        let mut frames = Vec::new();
        for chunk in bytes.chunks(PAGE) {
            let index = inner.alloc_frame();
            if let Some(frame) = inner.frames[index].as_mut() {
                frame.data[..chunk.len()].copy_from_slice(chunk);
            }
            frames.push(index);
        }
        let stored = StoredFile {
            frames,
            len: bytes.len() as u64,
        };
        if let Some(old) = inner.files.insert(path.to_owned(), stored) {
            for index in old.frames {
                inner.release_frame(index);
            }
        }
    }

    // =========================================================================
    // Introspection for tests
    // =========================================================================

    /// Number of domains that exist, runnable or not.
    #[must_use]
    pub fn domain_count(&self) -> usize {
        self.lock().domains.len()
    }

    /// Scheduling status of a domain.
    #[must_use]
    pub fn status_of(&self, domain: DomainId) -> Option<DomainStatus> {
        self.lock().domains.get(&domain.as_u64()).map(|d| d.status)
    }

    /// Installed register state of a domain.
    #[must_use]
    pub fn registers_of(&self, domain: DomainId) -> Option<InitialRegisters> {
        self.lock()
            .domains
            .get(&domain.as_u64())
            .map(|d| d.registers)
    }

    /// Frame index mapped at a page-aligned address, if any.
    #[must_use]
    pub fn frame_at(&self, domain: DomainId, addr: Vaddr) -> Option<usize> {
        self.lock()
            .domains
            .get(&domain.as_u64())?
            .mappings
            .get(&addr.as_u64())
            .map(|m| m.frame)
    }

    /// Permissions of the mapping at a page-aligned address, if any.
    #[must_use]
    pub fn perms_at(&self, domain: DomainId, addr: Vaddr) -> Option<PagePerms> {
        self.lock()
            .domains
            .get(&domain.as_u64())?
            .mappings
            .get(&addr.as_u64())
            .map(|m| m.perms)
    }

    /// Read memory out of any domain, crossing page boundaries.
    ///
    /// Returns `None` if any touched page is unmapped.
    #[must_use]
    pub fn read_memory(&self, domain: DomainId, addr: Vaddr, len: usize) -> Option<Vec<u8>> {
        let inner = self.lock();
        let domain = inner.domains.get(&domain.as_u64())?;
        let mut out = Vec::with_capacity(len);
        let mut position = addr.as_u64();
        while out.len() < len {
            let page = position & !(PAGE_SIZE - 1);
            let offset = (position - page) as usize;
            let take = usize::min(len - out.len(), PAGE - offset);
            let mapping = domain.mappings.get(&page)?;
            let frame = inner.frames[mapping.frame].as_ref()?;
            out.extend_from_slice(&frame.data[offset..offset + take]);
            position += take as u64;
        }
        Some(out)
    }

    /// Number of frames currently backing anything (mappings or files).
    #[must_use]
    pub fn live_frames(&self) -> usize {
        self.lock().frames.iter().flatten().count()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().expect("mock state poisoned")
    }
}

impl Default for MockOs {
    fn default() -> Self {
        Self::new()
    }
}

/// A per-domain view of a [`MockOs`].
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Shared>,
    domain: DomainId,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().expect("mock state poisoned")
    }
}

impl Kernel for MockHandle {
    fn current_domain(&self) -> DomainId {
        self.domain
    }

    fn create_domain(&self) -> Result<(DomainId, InitialRegisters), SysError> {
        let mut inner = self.lock();
        let id = inner.next_domain;
        inner.next_domain += 1;
        inner.domains.insert(id, Domain::new());
        Ok((DomainId::new(id), InitialRegisters::default()))
    }

    fn set_registers(
        &self,
        domain: DomainId,
        registers: &InitialRegisters,
    ) -> Result<(), SysError> {
        let mut inner = self.lock();
        let id = inner.resolve(self.domain, domain);
        inner.domain_mut(id)?.registers = *registers;
        Ok(())
    }

    fn set_runnable(&self, domain: DomainId) -> Result<(), SysError> {
        let mut inner = self.lock();
        let id = inner.resolve(self.domain, domain);
        inner.domain_mut(id)?.status = DomainStatus::Runnable;
        Ok(())
    }

    fn alloc_page(
        &self,
        domain: DomainId,
        addr: Vaddr,
        perms: PagePerms,
    ) -> Result<(), SysError> {
        check_page_addr(addr)?;
        check_map_perms(perms)?;
        let mut inner = self.lock();
        let id = inner.resolve(self.domain, domain);
        if !inner.domains.contains_key(&id) {
            return Err(SysError::BadDomain);
        }
        let frame = inner.alloc_frame();
        inner.install_mapping(id, addr, Mapping { frame, perms });
        Ok(())
    }

    fn map_page(
        &self,
        src_domain: DomainId,
        src_addr: Vaddr,
        dst_domain: DomainId,
        dst_addr: Vaddr,
        perms: PagePerms,
    ) -> Result<(), SysError> {
        check_page_addr(src_addr)?;
        check_page_addr(dst_addr)?;
        check_map_perms(perms)?;
        let mut inner = self.lock();
        let src = inner.resolve(self.domain, src_domain);
        let dst = inner.resolve(self.domain, dst_domain);
        let mapping = *inner
            .domains
            .get(&src)
            .ok_or(SysError::BadDomain)?
            .mappings
            .get(&src_addr.as_u64())
            .ok_or(SysError::Unmapped)?;
        if perms.write && !mapping.perms.write {
            return Err(SysError::Invalid);
        }
        if !inner.domains.contains_key(&dst) {
            return Err(SysError::BadDomain);
        }
        inner.retain_frame(mapping.frame);
        inner.install_mapping(
            dst,
            dst_addr,
            Mapping {
                frame: mapping.frame,
                perms,
            },
        );
        Ok(())
    }

    fn unmap_page(&self, domain: DomainId, addr: Vaddr) -> Result<(), SysError> {
        check_page_addr(addr)?;
        let mut inner = self.lock();
        let id = inner.resolve(self.domain, domain);
        let removed = inner.domain_mut(id)?.mappings.remove(&addr.as_u64());
        if let Some(mapping) = removed {
            inner.release_frame(mapping.frame);
        }
        Ok(())
    }

    fn try_send(
        &self,
        to: DomainId,
        value: u64,
        page: Vaddr,
        perms: PagePerms,
    ) -> Result<(), SysError> {
        if to.is_null() {
            return Err(SysError::BadDomain);
        }
        let mut inner = self.lock();
        let target = to.as_u64();
        let Some(receiver) = inner.domains.get(&target) else {
            return Err(SysError::BadDomain);
        };
        let Some(dst) = receiver.recv_at else {
            return Err(SysError::NotReceiving);
        };

        let mut perm_bits = 0;
        if page != NO_PAGE {
            check_page_addr(page)?;
            check_map_perms(perms)?;
            let caller = self.domain.as_u64();
            let mapping = *inner
                .domains
                .get(&caller)
                .ok_or(SysError::BadDomain)?
                .mappings
                .get(&page.as_u64())
                .ok_or(SysError::Unmapped)?;
            if perms.write && !mapping.perms.write {
                return Err(SysError::Invalid);
            }
            // A transfer only happens if the receiver asked for a page.
            if dst != NO_PAGE {
                inner.retain_frame(mapping.frame);
                inner.install_mapping(
                    target,
                    dst,
                    Mapping {
                        frame: mapping.frame,
                        perms,
                    },
                );
                perm_bits = perms.to_bits();
            }
        }

        let receiver = inner.domain_mut(target)?;
        receiver.rendezvous = RendezvousState {
            value,
            sender: self.domain,
            perm_bits,
        };
        receiver.recv_at = None;
        receiver.delivered = true;
        receiver.status = DomainStatus::Runnable;
        drop(inner);
        self.shared.wakeups.notify_all();
        Ok(())
    }

    fn blocking_recv(&self, dst: Vaddr) -> Result<(), SysError> {
        if dst != NO_PAGE {
            check_page_addr(dst)?;
        }
        let me = self.domain.as_u64();
        let mut inner = self.lock();
        {
            let domain = inner.domain_mut(me)?;
            domain.rendezvous = RendezvousState::cleared();
            domain.recv_at = Some(dst);
            domain.delivered = false;
            domain.status = DomainStatus::NotRunnable;
        }
        while !inner.domains.get(&me).is_some_and(|d| d.delivered) {
            inner = self
                .shared
                .wakeups
                .wait(inner)
                .expect("mock state poisoned");
        }
        inner.domain_mut(me)?.delivered = false;
        Ok(())
    }

    fn rendezvous_state(&self) -> RendezvousState {
        self.lock()
            .domains
            .get(&self.domain.as_u64())
            .map_or_else(RendezvousState::cleared, |d| d.rendezvous)
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn read_bytes(&self, addr: Vaddr, buf: &mut [u8]) -> Result<(), SysError> {
        let inner = self.lock();
        let domain = inner
            .domains
            .get(&self.domain.as_u64())
            .ok_or(SysError::BadDomain)?;
        let mut position = addr.as_u64();
        let mut done = 0;
        while done < buf.len() {
            let page = position & !(PAGE_SIZE - 1);
            let offset = (position - page) as usize;
            let take = usize::min(buf.len() - done, PAGE - offset);
            let mapping = domain.mappings.get(&page).ok_or(SysError::Unmapped)?;
            let frame = inner.frames[mapping.frame]
                .as_ref()
                .ok_or(SysError::Unmapped)?;
            buf[done..done + take].copy_from_slice(&frame.data[offset..offset + take]);
            position += take as u64;
            done += take;
        }
        Ok(())
    }

    fn write_bytes(&self, addr: Vaddr, bytes: &[u8]) -> Result<(), SysError> {
        let mut inner = self.lock();
        let me = self.domain.as_u64();
        let mut position = addr.as_u64();
        let mut done = 0;
        while done < bytes.len() {
            let page = position & !(PAGE_SIZE - 1);
            let offset = (position - page) as usize;
            let take = usize::min(bytes.len() - done, PAGE - offset);
            let mapping = *inner
                .domains
                .get(&me)
                .ok_or(SysError::BadDomain)?
                .mappings
                .get(&page)
                .ok_or(SysError::Unmapped)?;
            if !mapping.perms.write {
                return Err(SysError::Invalid);
            }
            let frame = inner.frames[mapping.frame]
                .as_mut()
                .ok_or(SysError::Unmapped)?;
            frame.data[offset..offset + take].copy_from_slice(&bytes[done..done + take]);
            position += take as u64;
            done += take;
        }
        Ok(())
    }
}

impl FileLayer for MockHandle {
    fn open(&self, path: &str) -> Result<Fd, SysError> {
        let mut inner = self.lock();
        if !inner.files.contains_key(path) {
            return Err(SysError::NotFound);
        }
        let slot = inner
            .open_files
            .iter()
            .position(Option::is_none)
            .ok_or(SysError::OutOfDescriptors)?;
        inner.open_files[slot] = Some(OpenFile {
            path: path.to_owned(),
            pos: 0,
        });
        Ok(Fd::new(slot as u32))
    }

    fn close(&self, fd: Fd) -> Result<(), SysError> {
        let mut inner = self.lock();
        inner
            .open_files
            .get_mut(fd.as_index() as usize)
            .and_then(Option::take)
            .ok_or(SysError::Invalid)?;
        // Tear down the descriptor's mapping stripe in the caller.
        let base = fd.window_base().as_u64();
        let end = base + FILE_WINDOW_STRIDE;
        let me = self.domain.as_u64();
        let stripe: Vec<(u64, usize)> = inner.domains.get(&me).map_or_else(Vec::new, |domain| {
            domain
                .mappings
                .range(base..end)
                .map(|(addr, mapping)| (*addr, mapping.frame))
                .collect()
        });
        for (addr, frame) in stripe {
            if let Some(domain) = inner.domains.get_mut(&me) {
                domain.mappings.remove(&addr);
            }
            inner.release_frame(frame);
        }
        Ok(())
    }

    fn seek(&self, fd: Fd, offset: u64) -> Result<(), SysError> {
        let mut inner = self.lock();
        inner.open_entry(fd)?.pos = offset;
        Ok(())
    }

    fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize, SysError> {
        let mut inner = self.lock();
        let entry = inner.open_entry(fd)?;
        let path = entry.path.clone();
        let pos = entry.pos;
        let file = inner.files.get(&path).ok_or(SysError::Io)?;
        let available = file.len.saturating_sub(pos);
        let total = usize::min(buf.len(), available as usize);
        let frames: Vec<usize> = file.frames.clone();
        let mut done = 0;
        let mut position = pos;
        while done < total {
            let page = (position / PAGE_SIZE) as usize;
            let offset = (position % PAGE_SIZE) as usize;
            let take = usize::min(total - done, PAGE - offset);
            let frame = inner.frames[frames[page]].as_ref().ok_or(SysError::Io)?;
            buf[done..done + take].copy_from_slice(&frame.data[offset..offset + take]);
            position += take as u64;
            done += take;
        }
        inner.open_entry(fd)?.pos = position;
        Ok(total)
    }

    fn read_map(&self, fd: Fd, offset: u64) -> Result<Vaddr, SysError> {
        if offset % PAGE_SIZE != 0 {
            return Err(SysError::Invalid);
        }
        let mut inner = self.lock();
        let path = inner.open_entry(fd)?.path.clone();
        let file = inner.files.get(&path).ok_or(SysError::Io)?;
        let page = (offset / PAGE_SIZE) as usize;
        let frame = *file.frames.get(page).ok_or(SysError::Invalid)?;
        let addr = fd.window_base() + offset;
        let me = self.domain.as_u64();
        let already = inner
            .domains
            .get(&me)
            .and_then(|d| d.mappings.get(&addr.as_u64()))
            .is_some();
        if !already {
            if !inner.domains.contains_key(&me) {
                return Err(SysError::BadDomain);
            }
            inner.retain_frame(frame);
            inner.install_mapping(
                me,
                addr,
                Mapping {
                    frame,
                    perms: PagePerms::ro_user(),
                },
            );
        }
        Ok(addr)
    }
}
