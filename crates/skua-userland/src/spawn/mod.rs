// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The domain loader.
//!
//! [`spawn`] turns an executable file into a running domain: it validates
//! the image, creates a fresh domain, builds its argument stack, installs
//! its segments and finally marks it runnable. Read-only segments are not
//! copied at all; their file pages are mapped shared straight out of the
//! file layer, so every domain spawned from the same image shares its text.
//! Writable segments get private copies assembled page by page in the
//! scratch window.
//!
//! Failure is fail-fast: the first error aborts the load. A domain that
//! was already created by then stays behind not-runnable; it never runs
//! half-constructed.


use crate::image::{Image, ImageError, PREFIX_SIZE, Segment};
use crate::platform::{Fd, FileLayer, Kernel};
use crate::scratch::ScratchPage;
use crate::stack::{StackError, push_args};
use core::fmt;
use log::{debug, warn};
use skua_abi::layout::{page_round_down, page_round_up};
use skua_abi::{DomainId, InitialRegisters, PAGE_SIZE, PagePerms, ScratchAddr, SysError};

/// Read granularity when copying writable segment content.
const COPY_CHUNK: usize = 512;

/// Why a spawn failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnError {
    /// The executable could not be opened.
    Open(SysError),
    /// Reading or mapping file content failed.
    Read(SysError),
    /// The file is not a loadable image.
    Image(ImageError),
    /// No fresh domain could be created.
    CreateDomain(SysError),
    /// The argument stack could not be built.
    Stack(StackError),
    /// Installing a segment page failed.
    Segment(SysError),
    /// Installing registers or starting the domain failed.
    Start(SysError),
}

impl SpawnError {
    /// Flatten to the error code the kernel boundary would carry.
    #[must_use]
    pub const fn sys_error(&self) -> SysError {
        match self {
            Self::Open(err)
            | Self::Read(err)
            | Self::CreateDomain(err)
            | Self::Segment(err)
            | Self::Start(err) => *err,
            Self::Image(_) => SysError::InvalidFormat,
            Self::Stack(err) => err.sys_error(),
        }
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(err) => write!(f, "opening the executable failed: {err}"),
            Self::Read(err) => write!(f, "reading the executable failed: {err}"),
            Self::Image(err) => write!(f, "not a loadable image: {err}"),
            Self::CreateDomain(err) => write!(f, "creating the domain failed: {err}"),
            Self::Stack(err) => write!(f, "building the argument stack failed: {err}"),
            Self::Segment(err) => write!(f, "installing a segment failed: {err}"),
            Self::Start(err) => write!(f, "starting the domain failed: {err}"),
        }
    }
}

/// Start a new domain running the executable at `path`.
///
/// `argv` becomes the program's argument vector; by convention the first
/// entry is the program name. Returns the new domain's identifier once it
/// is runnable.
pub fn spawn<K: Kernel, F: FileLayer>(
    kernel: &K,
    files: &F,
    path: &str,
    argv: &[&str],
) -> Result<DomainId, SpawnError> {
    debug!("spawning {path} with {} argument(s)", argv.len());
    let fd = files.open(path).map_err(SpawnError::Open)?;
    let result = load(kernel, files, fd, path, argv);
    if files.close(fd).is_err() {
        debug!("failed to close descriptor for {path}");
    }
    result
}

fn load<K: Kernel, F: FileLayer>(
    kernel: &K,
    files: &F,
    fd: Fd,
    path: &str,
    argv: &[&str],
) -> Result<DomainId, SpawnError> {
    let mut prefix = [0u8; PREFIX_SIZE];
    let got = files.read(fd, &mut prefix).map_err(SpawnError::Read)?;
    let image = Image::parse(&prefix[..got]).map_err(SpawnError::Image)?;

    let (child, mut registers) = kernel.create_domain().map_err(SpawnError::CreateDomain)?;
    debug!("{child}: created for {path}, entry {}", image.entry_point());

    match construct(kernel, files, fd, &image, child, &mut registers, argv) {
        Ok(()) => {
            debug!("{child}: runnable");
            Ok(child)
        }
        Err(err) => {
            warn!("{child}: load of {path} failed, domain left unstarted: {err}");
            Err(err)
        }
    }
}

fn construct<K: Kernel, F: FileLayer>(
    kernel: &K,
    files: &F,
    fd: Fd,
    image: &Image<'_>,
    child: DomainId,
    registers: &mut InitialRegisters,
    argv: &[&str],
) -> Result<(), SpawnError> {
    let sp = push_args(kernel, child, argv).map_err(SpawnError::Stack)?;

    for segment in image.segments() {
        if segment.writable {
            load_writable(kernel, files, fd, child, &segment)?;
        } else {
            map_shared(kernel, files, fd, child, &segment)?;
        }
    }

    // The record handed out by create_domain is the baseline; only the
    // entry point and stack pointer are the loader's to decide.
    registers.pc = image.entry_point();
    registers.sp = sp;
    kernel
        .set_registers(child, registers)
        .map_err(SpawnError::Start)?;
    kernel.set_runnable(child).map_err(SpawnError::Start)
}

/// Map a read-only segment's file pages shared into the child.
///
/// Only the file-backed pages are mapped; a read-only segment claiming
/// memory beyond its file extent gets no anonymous tail, as there is
/// nothing meaningful to put there.
fn map_shared<K: Kernel, F: FileLayer>(
    kernel: &K,
    files: &F,
    fd: Fd,
    child: DomainId,
    segment: &Segment,
) -> Result<(), SpawnError> {
    let first = page_round_down(segment.offset);
    let last = page_round_up(segment.offset + segment.file_size);
    let base = segment.vaddr.page_align_down();

    let mut offset = first;
    while offset < last {
        let block = files.read_map(fd, offset).map_err(SpawnError::Read)?;
        kernel
            .map_page(
                DomainId::SELF,
                block,
                child,
                base + (offset - first),
                PagePerms::ro_user(),
            )
            .map_err(SpawnError::Segment)?;
        offset += PAGE_SIZE;
    }
    Ok(())
}

/// Build a writable segment out of private pages.
///
/// Each page is staged in the scratch window (zeroed on allocation, so the
/// zero-fill tail beyond the file content comes for free), filled from the
/// file where the segment has content, and grafted into the child.
fn load_writable<K: Kernel, F: FileLayer>(
    kernel: &K,
    files: &F,
    fd: Fd,
    child: DomainId,
    segment: &Segment,
) -> Result<(), SpawnError> {
    let first = page_round_down(segment.offset);
    let last = page_round_up(segment.offset + segment.mem_size);
    let file_end = segment.offset + segment.file_size;
    let base = segment.vaddr.page_align_down();

    let mut chunk = first;
    while chunk < last {
        let page = ScratchPage::acquire(kernel).map_err(SpawnError::Segment)?;
        if chunk < file_end {
            fill_from_file(files, fd, &page, segment, chunk, file_end)?;
        }
        page.graft(child, base + (chunk - first), PagePerms::rw_user())
            .map_err(SpawnError::Segment)?;
        chunk += PAGE_SIZE;
    }
    Ok(())
}

/// Copy the file-resident part of one segment page into the staging page.
fn fill_from_file<K: Kernel, F: FileLayer>(
    files: &F,
    fd: Fd,
    page: &ScratchPage<'_, K>,
    segment: &Segment,
    chunk: u64,
    file_end: u64,
) -> Result<(), SpawnError> {
    let from = chunk.max(segment.offset);
    let until = file_end.min(chunk + PAGE_SIZE);
    files.seek(fd, from).map_err(SpawnError::Read)?;

    let mut buffer = [0u8; COPY_CHUNK];
    let mut position = from;
    while position < until {
        let want = usize::min((until - position) as usize, buffer.len());
        let got = files.read(fd, &mut buffer[..want]).map_err(SpawnError::Read)?;
        if got == 0 {
            // The image's headers promised more content than the file has.
            return Err(SpawnError::Read(SysError::Io));
        }
        let at = ScratchAddr::at_offset(position - chunk)
            .ok_or(SpawnError::Segment(SysError::Invalid))?;
        page.write(at, &buffer[..got]).map_err(SpawnError::Segment)?;
        position += got as u64;
    }
    Ok(())
}
